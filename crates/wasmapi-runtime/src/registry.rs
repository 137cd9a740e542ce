//! Child API registry.
//!
//! A child API contributes import functions to the shared `wasmapi`
//! namespace and gets an async `init` call once the guest is instantiated.
//! Import names are checked for collisions when an API is registered.
//! Initialization runs in dependency order (registration order among
//! independent APIs) and stops at the first API whose `init` returns
//! `false`.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};
use wasmi::{IntoFunc, Linker};

use crate::bridge::WasmBridge;
use crate::core_api::{self, HostState, CORE_ID, CORE_IMPORTS};
use crate::error::{BridgeError, BridgeResult, InitError};

/// Future returned by [`WasmApi::init`]; resolves to the success flag.
pub type InitFuture<'a> = Pin<Box<dyn Future<Output = bool> + 'a>>;

/// A pluggable capability module.
pub trait WasmApi {
    /// Unique id. Also used in error reports.
    fn id(&self) -> &str;

    /// Ids of APIs that must be initialized first. The core is implicit.
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    /// Every import name [`WasmApi::link`] defines.
    fn import_names(&self) -> &[&str];

    fn link(&self, linker: &mut ApiLinker<'_>) -> BridgeResult<()>;

    fn init<'a>(&'a mut self, bridge: &'a mut WasmBridge) -> InitFuture<'a>;
}

/// Linker handle given to [`WasmApi::link`]; only accepts declared names.
pub struct ApiLinker<'l> {
    linker: &'l mut Linker<HostState>,
    api: &'l str,
    declared: &'l [&'l str],
}

impl ApiLinker<'_> {
    pub fn func<Params, Results>(
        &mut self,
        name: &str,
        func: impl IntoFunc<HostState, Params, Results>,
    ) -> BridgeResult<&mut Self> {
        if !self.declared.contains(&name) {
            return Err(BridgeError::Link {
                name: name.to_string(),
                reason: format!("`{}` does not declare this import", self.api),
            });
        }
        core_api::define(self.linker, name, func)?;
        Ok(self)
    }
}

#[derive(Default)]
pub struct ApiRegistry {
    apis: Vec<Box<dyn WasmApi>>,
    /// import name → owning API id
    owners: BTreeMap<String, String>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an API. Rejects duplicate ids and import names already taken by
    /// the core or another API; the registry is unchanged on error.
    pub fn register(&mut self, api: impl WasmApi + 'static) -> Result<(), InitError> {
        let id = api.id().to_string();
        if id == CORE_ID || self.get(&id).is_some() {
            return Err(InitError::DuplicateApi(id));
        }
        let mut seen = BTreeMap::new();
        for name in api.import_names() {
            let first = if CORE_IMPORTS.contains(name) {
                Some(CORE_ID)
            } else {
                self.owners.get(*name).map(String::as_str)
            };
            if let Some(first) = first.or_else(|| seen.get(name).copied()) {
                return Err(InitError::ImportCollision {
                    name: name.to_string(),
                    first: first.to_string(),
                    second: id.clone(),
                });
            }
            seen.insert(*name, id.as_str());
        }
        for name in api.import_names() {
            self.owners.insert(name.to_string(), id.clone());
        }
        debug!(target: "wasmapi", %id, imports = api.import_names().len(), "registered child API");
        self.apis.push(Box::new(api));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.apis.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apis.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.apis.iter().map(|a| a.id())
    }

    pub fn get(&self, id: &str) -> Option<&dyn WasmApi> {
        self.apis.iter().find(|a| a.id() == id).map(|a| a.as_ref())
    }

    /// API owning an import name, `"wasmapi"` for core imports.
    pub fn owner_of(&self, import: &str) -> Option<&str> {
        if CORE_IMPORTS.contains(&import) {
            return Some(CORE_ID);
        }
        self.owners.get(import).map(String::as_str)
    }

    pub(crate) fn link(&self, linker: &mut Linker<HostState>) -> BridgeResult<()> {
        for api in &self.apis {
            let mut scoped = ApiLinker {
                linker: &mut *linker,
                api: api.id(),
                declared: api.import_names(),
            };
            api.link(&mut scoped)?;
        }
        Ok(())
    }

    /// Initialization order, core excluded.
    pub fn init_order(&self) -> Result<Vec<&str>, InitError> {
        Ok(self.order()?.into_iter().map(|i| self.apis[i].id()).collect())
    }

    fn order(&self) -> Result<Vec<usize>, InitError> {
        for api in &self.apis {
            for dep in api.dependencies() {
                if *dep != CORE_ID && self.get(dep).is_none() {
                    return Err(InitError::UnknownDependency {
                        id: api.id().to_string(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        let mut done = vec![false; self.apis.len()];
        let mut order = Vec::with_capacity(self.apis.len());
        while order.len() < self.apis.len() {
            let ready = (0..self.apis.len()).find(|&i| {
                !done[i]
                    && self.apis[i].dependencies().iter().all(|dep| {
                        *dep == CORE_ID || self.apis.iter().zip(&done).any(|(a, d)| *d && a.id() == *dep)
                    })
            });
            match ready {
                Some(i) => {
                    done[i] = true;
                    order.push(i);
                }
                None => {
                    let stuck = (0..self.apis.len())
                        .filter(|&i| !done[i])
                        .map(|i| self.apis[i].id().to_string())
                        .collect();
                    return Err(InitError::DependencyCycle(stuck));
                }
            }
        }
        Ok(order)
    }

    /// Initialize the core, then every API in dependency order.
    pub async fn init(&mut self, bridge: &mut WasmBridge) -> BridgeResult<()> {
        let order = self.order()?;
        bridge.ensure_views();
        debug!(target: "wasmapi", id = CORE_ID, "core initialized");
        for idx in order {
            let api = &mut self.apis[idx];
            let id = api.id().to_string();
            if !api.init(bridge).await {
                warn!(target: "wasmapi", %id, "child API init failed");
                return Err(InitError::ModuleFailed { id }.into());
            }
            debug!(target: "wasmapi", %id, "child API initialized");
        }
        Ok(())
    }
}

impl std::fmt::Debug for ApiRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRegistry")
            .field("apis", &self.ids().collect::<Vec<_>>())
            .field("imports", &self.owners)
            .finish()
    }
}

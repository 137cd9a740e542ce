//! Core API imports.
//!
//! Diagnostic functions every guest may import from the `wasmapi`
//! namespace. Printed values are emitted as `info!` events and recorded in
//! the store's [`HostState`] output buffer, one line per call. Names with a
//! leading underscore take raw `(addr, len)` arguments and are normally
//! wrapped by guest-side helpers.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info};
use wasmi::{Caller, Extern, IntoFunc, Linker};

use crate::error::{BridgeError, BridgeResult};
use crate::memory::{Element, TypedView};

/// Id of the implicit core module. Always initialized first.
pub const CORE_ID: &str = "wasmapi";

/// Import namespace shared by the core and every child API.
pub const NAMESPACE: &str = "wasmapi";

/// Every import name the core defines.
pub const CORE_IMPORTS: &[&str] = &[
    "printI8",
    "printU8",
    "printU8Hex",
    "printI16",
    "printU16",
    "printU16Hex",
    "printI32",
    "printU32",
    "printU32Hex",
    "printI64",
    "printU64",
    "printU64Hex",
    "printF32",
    "printF64",
    "_printI8Array",
    "_printU8Array",
    "_printI16Array",
    "_printU16Array",
    "_printI32Array",
    "_printU32Array",
    "_printI64Array",
    "_printU64Array",
    "_printF32Array",
    "_printF64Array",
    "_printStr0",
    "_printStr",
    "printHexdump",
    "debug",
    "_panic",
    "timer",
    "epoch",
];

/// Store data shared by all host functions.
#[derive(Debug)]
pub struct HostState {
    memory_export: String,
    output: Vec<String>,
    started: Instant,
    panic: Option<String>,
}

impl HostState {
    pub(crate) fn new(memory_export: impl Into<String>) -> Self {
        Self {
            memory_export: memory_export.into(),
            output: Vec::new(),
            started: Instant::now(),
            panic: None,
        }
    }

    /// Lines printed by the guest so far.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    pub fn take_output(&mut self) -> Vec<String> {
        std::mem::take(&mut self.output)
    }

    /// Message passed to the most recent `_panic` call.
    pub fn panic_message(&self) -> Option<&str> {
        self.panic.as_deref()
    }

    fn emit(&mut self, line: String) {
        info!(target: "wasmapi", "{line}");
        self.output.push(line);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Linking
// ══════════════════════════════════════════════════════════════════════════════

/// Define one function in the shared namespace.
pub(crate) fn define<Params, Results>(
    linker: &mut Linker<HostState>,
    name: &str,
    func: impl IntoFunc<HostState, Params, Results>,
) -> BridgeResult<()> {
    linker
        .func_wrap(NAMESPACE, name, func)
        .map(|_| ())
        .map_err(|e| BridgeError::Link {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

type Host<'a> = Caller<'a, HostState>;

pub(crate) fn link(linker: &mut Linker<HostState>) -> BridgeResult<()> {
    define(linker, "printI8", |mut c: Host<'_>, x: i32| c.data_mut().emit((x as i8).to_string()))?;
    define(linker, "printU8", |mut c: Host<'_>, x: i32| c.data_mut().emit((x as u8).to_string()))?;
    define(linker, "printU8Hex", |mut c: Host<'_>, x: i32| {
        c.data_mut().emit(format!("0x{:02x}", x as u8))
    })?;
    define(linker, "printI16", |mut c: Host<'_>, x: i32| c.data_mut().emit((x as i16).to_string()))?;
    define(linker, "printU16", |mut c: Host<'_>, x: i32| c.data_mut().emit((x as u16).to_string()))?;
    define(linker, "printU16Hex", |mut c: Host<'_>, x: i32| {
        c.data_mut().emit(format!("0x{:04x}", x as u16))
    })?;
    define(linker, "printI32", |mut c: Host<'_>, x: i32| c.data_mut().emit(x.to_string()))?;
    define(linker, "printU32", |mut c: Host<'_>, x: i32| c.data_mut().emit((x as u32).to_string()))?;
    define(linker, "printU32Hex", |mut c: Host<'_>, x: i32| {
        c.data_mut().emit(format!("0x{:08x}", x as u32))
    })?;
    define(linker, "printI64", |mut c: Host<'_>, x: i64| c.data_mut().emit(x.to_string()))?;
    define(linker, "printU64", |mut c: Host<'_>, x: i64| c.data_mut().emit((x as u64).to_string()))?;
    define(linker, "printU64Hex", |mut c: Host<'_>, x: i64| {
        c.data_mut().emit(format!("0x{:016x}", x as u64))
    })?;
    define(linker, "printF32", |mut c: Host<'_>, x: f32| c.data_mut().emit(x.to_string()))?;
    define(linker, "printF64", |mut c: Host<'_>, x: f64| c.data_mut().emit(x.to_string()))?;

    define(linker, "_printI8Array", print_array::<i8>)?;
    define(linker, "_printU8Array", print_array::<u8>)?;
    define(linker, "_printI16Array", print_array::<i16>)?;
    define(linker, "_printU16Array", print_array::<u16>)?;
    define(linker, "_printI32Array", print_array::<i32>)?;
    define(linker, "_printU32Array", print_array::<u32>)?;
    define(linker, "_printI64Array", print_array::<i64>)?;
    define(linker, "_printU64Array", print_array::<u64>)?;
    define(linker, "_printF32Array", print_array::<f32>)?;
    define(linker, "_printF64Array", print_array::<f64>)?;

    define(linker, "_printStr0", |mut c: Host<'_>, addr: i32| -> Result<(), wasmi::Error> {
        let text = read_cstr(&c, addr as u32)?;
        c.data_mut().emit(text);
        Ok(())
    })?;
    define(linker, "_printStr", |mut c: Host<'_>, addr: i32, len: i32| -> Result<(), wasmi::Error> {
        let bytes = read_guest(&c, addr as u32, len as u32 as usize)?;
        c.data_mut().emit(String::from_utf8_lossy(&bytes).into_owned());
        Ok(())
    })?;
    define(linker, "printHexdump", |mut c: Host<'_>, addr: i32, len: i32| -> Result<(), wasmi::Error> {
        let bytes = read_guest(&c, addr as u32, len as u32 as usize)?;
        for line in hexdump(addr as u32, &bytes) {
            c.data_mut().emit(line);
        }
        Ok(())
    })?;
    define(linker, "debug", |_: Host<'_>| debug!(target: "wasmapi", "guest debug hook"))?;
    define(linker, "_panic", |mut c: Host<'_>, addr: i32, len: i32| -> Result<(), wasmi::Error> {
        let bytes = read_guest(&c, addr as u32, len as u32 as usize)?;
        let msg = String::from_utf8_lossy(&bytes).into_owned();
        c.data_mut().panic = Some(msg.clone());
        Err(wasmi::Error::new(format!("guest panic: {msg}")))
    })?;
    define(linker, "timer", |c: Host<'_>| -> f64 {
        c.data().started.elapsed().as_secs_f64() * 1000.0
    })?;
    define(linker, "epoch", |_: Host<'_>| -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    })?;
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Guest memory access from host functions
// ══════════════════════════════════════════════════════════════════════════════

fn guest_bytes<'a>(caller: &'a Host<'_>) -> Result<&'a [u8], wasmi::Error> {
    let name = &caller.data().memory_export;
    let memory = caller
        .get_export(name)
        .and_then(Extern::into_memory)
        .ok_or_else(|| wasmi::Error::new(format!("guest does not export `{name}`")))?;
    Ok(memory.data(caller))
}

/// Copy `len` bytes out of guest memory.
pub(crate) fn read_guest(caller: &Host<'_>, addr: u32, len: usize) -> Result<Vec<u8>, wasmi::Error> {
    let start = addr as usize;
    guest_bytes(caller)?
        .get(start..start.saturating_add(len))
        .map(<[u8]>::to_vec)
        .ok_or_else(|| wasmi::Error::new(format!("out of bounds read: {len} bytes at {addr:#x}")))
}

fn read_cstr(caller: &Host<'_>, addr: u32) -> Result<String, wasmi::Error> {
    let bytes = guest_bytes(caller)?
        .get(addr as usize..)
        .ok_or_else(|| wasmi::Error::new(format!("out of bounds read at {addr:#x}")))?;
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

fn print_array<T: Element>(mut caller: Host<'_>, addr: i32, len: i32) -> Result<(), wasmi::Error> {
    let bytes = read_guest(&caller, addr as u32, (len as u32 as usize).saturating_mul(T::SIZE))?;
    let items = TypedView::<T>::new(&bytes).to_vec();
    caller.data_mut().emit(format!("{items:?}"));
    Ok(())
}

/// Classic 16-bytes-per-row dump: address, hex bytes, printable ASCII.
pub(crate) fn hexdump(base: u32, bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let hex = chunk.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ");
            let ascii: String = chunk
                .iter()
                .map(|b| if b.is_ascii_graphic() || *b == b' ' { *b as char } else { '.' })
                .collect();
            format!("{:08x} | {hex:<47} | {ascii}", base as usize + row * 16)
        })
        .collect()
}

//! Guest modules for runtime tests, assembled with wasm-encoder.

#![allow(dead_code)]

use wasm_encoder::{
    BlockType, CodeSection, ConstExpr, DataSection, EntityType, ExportKind, ExportSection, Function,
    FunctionSection, GlobalSection, GlobalType, ImportSection, Instruction, MemorySection, MemoryType,
    Module, TypeSection, ValType,
};

/// First address handed out by the bump allocator.
pub const HEAP_START: i32 = 1024;

pub struct Guest {
    types: Vec<(Vec<ValType>, Vec<ValType>)>,
    imports: Vec<(String, u32)>,
    funcs: Vec<(u32, Function, String)>,
    data: Vec<(i32, Vec<u8>)>,
    min_pages: u64,
    max_pages: Option<u64>,
    allocator: bool,
}

impl Guest {
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            imports: Vec::new(),
            funcs: Vec::new(),
            data: Vec::new(),
            min_pages: 1,
            max_pages: None,
            allocator: false,
        }
    }

    pub fn max_pages(mut self, max: u64) -> Self {
        self.max_pages = Some(max);
        self
    }

    fn ty(&mut self, params: &[ValType], results: &[ValType]) -> u32 {
        if let Some(i) = self.types.iter().position(|(p, r)| p == params && r == results) {
            return i as u32;
        }
        self.types.push((params.to_vec(), results.to_vec()));
        (self.types.len() - 1) as u32
    }

    /// Import `wasmapi.<name>`; returns its function index. Call before
    /// defining any function.
    pub fn import(&mut self, name: &str, params: &[ValType], results: &[ValType]) -> u32 {
        assert!(self.funcs.is_empty(), "imports must come first");
        let ty = self.ty(params, results);
        self.imports.push((name.to_string(), ty));
        (self.imports.len() - 1) as u32
    }

    /// Define and export a function; `body` must not emit the final `end`.
    pub fn func(
        &mut self,
        export: &str,
        params: &[ValType],
        results: &[ValType],
        locals: &[ValType],
        body: impl FnOnce(&mut Function),
    ) -> u32 {
        let ty = self.ty(params, results);
        let mut f = Function::new(locals.iter().map(|t| (1, *t)).collect::<Vec<_>>());
        body(&mut f);
        f.instruction(&Instruction::End);
        self.funcs.push((ty, f, export.to_string()));
        (self.imports.len() + self.funcs.len() - 1) as u32
    }

    pub fn data(&mut self, offset: i32, bytes: &[u8]) {
        self.data.push((offset, bytes.to_vec()));
    }

    /// Bump allocator with 8-byte granularity. `_wasm_free` releases only
    /// the most recent allocation. Exhaustion returns 0.
    pub fn with_allocator(mut self) -> Self {
        self.allocator = true;
        let i32_ = ValType::I32;
        self.func("_wasm_allocate", &[i32_], &[i32_], &[i32_], |f| {
            // local 1 = new heap top
            f.instruction(&Instruction::GlobalGet(0));
            round_up_size(f, 0);
            f.instruction(&Instruction::I32Add);
            f.instruction(&Instruction::LocalTee(1));
            f.instruction(&Instruction::MemorySize(0));
            f.instruction(&Instruction::I32Const(16));
            f.instruction(&Instruction::I32Shl);
            f.instruction(&Instruction::I32GtU);
            f.instruction(&Instruction::If(BlockType::Empty));
            f.instruction(&Instruction::I32Const(0));
            f.instruction(&Instruction::Return);
            f.instruction(&Instruction::End);
            f.instruction(&Instruction::GlobalGet(0));
            f.instruction(&Instruction::LocalGet(1));
            f.instruction(&Instruction::GlobalSet(0));
        });
        self.func("_wasm_free", &[i32_, i32_], &[], &[], |f| {
            f.instruction(&Instruction::LocalGet(0));
            round_up_size(f, 1);
            f.instruction(&Instruction::I32Add);
            f.instruction(&Instruction::GlobalGet(0));
            f.instruction(&Instruction::I32Eq);
            f.instruction(&Instruction::If(BlockType::Empty));
            f.instruction(&Instruction::LocalGet(0));
            f.instruction(&Instruction::GlobalSet(0));
            f.instruction(&Instruction::End);
        });
        self
    }

    pub fn finish(self) -> Vec<u8> {
        let mut module = Module::new();

        let mut types = TypeSection::new();
        for (params, results) in &self.types {
            types.ty().function(params.clone(), results.clone());
        }
        module.section(&types);

        let mut imports = ImportSection::new();
        for (name, ty) in &self.imports {
            imports.import("wasmapi", name, EntityType::Function(*ty));
        }
        module.section(&imports);

        let mut functions = FunctionSection::new();
        for (ty, _, _) in &self.funcs {
            functions.function(*ty);
        }
        module.section(&functions);

        let mut memory = MemorySection::new();
        memory.memory(MemoryType {
            minimum: self.min_pages,
            maximum: self.max_pages,
            memory64: false,
            shared: false,
            page_size_log2: None,
        });
        module.section(&memory);

        let mut globals = GlobalSection::new();
        globals.global(
            GlobalType {
                val_type: ValType::I32,
                mutable: true,
                shared: false,
            },
            &ConstExpr::i32_const(HEAP_START),
        );
        module.section(&globals);

        let mut exports = ExportSection::new();
        exports.export("memory", ExportKind::Memory, 0);
        let base = self.imports.len() as u32;
        for (i, (_, _, name)) in self.funcs.iter().enumerate() {
            exports.export(name, ExportKind::Func, base + i as u32);
        }
        module.section(&exports);

        let mut code = CodeSection::new();
        for (_, f, _) in &self.funcs {
            code.function(f);
        }
        module.section(&code);

        if !self.data.is_empty() {
            let mut data = DataSection::new();
            for (offset, bytes) in &self.data {
                data.active(0, &ConstExpr::i32_const(*offset), bytes.iter().copied());
            }
            module.section(&data);
        }

        let wasm = module.finish();
        wasmparser::validate(&wasm).expect("guest module should validate");
        wasm
    }
}

/// Push `(local + 7) & -8`.
fn round_up_size(f: &mut Function, local: u32) {
    f.instruction(&Instruction::LocalGet(local));
    f.instruction(&Instruction::I32Const(7));
    f.instruction(&Instruction::I32Add);
    f.instruction(&Instruction::I32Const(-8));
    f.instruction(&Instruction::I32And);
}

/// Guest with only memory and the allocator.
pub fn allocator_guest() -> Vec<u8> {
    Guest::new().with_allocator().finish()
}

/// Guest whose memory can grow to `max` pages.
pub fn growable_guest(max: u64) -> Vec<u8> {
    Guest::new().max_pages(max).with_allocator().finish()
}

/// Guest with no allocator exports.
pub fn bare_guest() -> Vec<u8> {
    Guest::new().finish()
}

/// Guest exercising core imports: `say(i32)`, `say_bytes()`, `shout()`,
/// `boom()`.
pub fn printing_guest() -> Vec<u8> {
    let i32_ = ValType::I32;
    let mut g = Guest::new();
    let print_i32 = g.import("printI32", &[i32_], &[]);
    let print_u8s = g.import("_printU8Array", &[i32_, i32_], &[]);
    let print_str0 = g.import("_printStr0", &[i32_], &[]);
    let panic = g.import("_panic", &[i32_, i32_], &[]);
    g.data(16, b"oh no");
    g.data(32, &[1, 2, 3]);
    g.data(48, b"hello\0");
    g.func("say", &[i32_], &[], &[], |f| {
        f.instruction(&Instruction::LocalGet(0));
        f.instruction(&Instruction::Call(print_i32));
    });
    g.func("say_bytes", &[], &[], &[], |f| {
        f.instruction(&Instruction::I32Const(32));
        f.instruction(&Instruction::I32Const(3));
        f.instruction(&Instruction::Call(print_u8s));
    });
    g.func("shout", &[], &[], &[], |f| {
        f.instruction(&Instruction::I32Const(48));
        f.instruction(&Instruction::Call(print_str0));
    });
    g.func("boom", &[], &[], &[], |f| {
        f.instruction(&Instruction::I32Const(16));
        f.instruction(&Instruction::I32Const(5));
        f.instruction(&Instruction::Call(panic));
    });
    g.with_allocator().finish()
}

/// Guest using the timer API. The callback prints the timer id.
pub fn timer_guest(with_callback: bool) -> Vec<u8> {
    let i32_ = ValType::I32;
    let mut g = Guest::new();
    let schedule = g.import("_schedule", &[i32_, i32_], &[i32_]);
    let cancel = g.import("_cancel", &[i32_], &[]);
    let print_u32 = g.import("printU32", &[i32_], &[]);
    g.func("schedule", &[i32_, i32_], &[i32_], &[], |f| {
        f.instruction(&Instruction::LocalGet(0));
        f.instruction(&Instruction::LocalGet(1));
        f.instruction(&Instruction::Call(schedule));
    });
    g.func("cancel", &[i32_], &[], &[], |f| {
        f.instruction(&Instruction::LocalGet(0));
        f.instruction(&Instruction::Call(cancel));
    });
    if with_callback {
        g.func("_timer_callback", &[i32_], &[], &[], |f| {
            f.instruction(&Instruction::LocalGet(0));
            f.instruction(&Instruction::Call(print_u32));
        });
    }
    g.finish()
}

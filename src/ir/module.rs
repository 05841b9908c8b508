//! Modules: the top-level container of data definitions and functions.

use super::func::Function;
use super::value::PrimType;
use super::BlockId;

/// One item inside a [`Data`] definition: either a typed constant value or
/// a run of zero-filled bytes.
#[derive(Debug, Clone)]
pub enum DataItem {
    /// A typed constant value (`t v` in textual IR).
    Const { ty: PrimType, bits: u64 },
    /// `n` zero bytes (`z n` in textual IR).
    Zero(usize),
}

/// A global data definition.
#[derive(Debug, Clone)]
pub struct Data {
    pub name: String,
    pub align: usize,
    pub export: bool,
    pub items: Vec<DataItem>,
}

/// The top-level IR container: an ordered list of data definitions, an
/// ordered list of functions, and the module-wide block-id counter.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub datas: Vec<Data>,
    pub functions: Vec<Function>,
    next_block_id: u32,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh, module-unique block id.
    pub fn fresh_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        id
    }

    pub fn add_data(&mut self, data: Data) {
        self.datas.push(data);
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut Function> {
        self.functions.iter_mut().find(|f| f.name == name)
    }
}

//! The pass framework (§4.10): `Pass` is the abstract base `run(module) ->
//! changed`; `ModulePass`, `FunctionPass`, and `BasicBlockPass` narrow the
//! unit a pass overrides; `Pipeline` composes an ordered sequence and runs
//! them in order, returning the disjunction of their `changed` bits.
//!
//! Passes document their prerequisites and invalidations in their own doc
//! comments; the driver (the concrete `Pipeline` a caller assembles) is
//! responsible for ordering them correctly.

use crate::error::Fatal;
use crate::ir::{Function, Module};

/// The common interface every optimization/analysis pass implements.
pub trait Pass {
    /// Human-readable name, used in `tracing` spans and pipeline logs.
    fn name(&self) -> &'static str;

    /// Run the pass over the whole module, returning whether it changed
    /// anything.
    fn run(&mut self, module: &mut Module) -> Result<bool, Fatal>;
}

/// A pass that operates on the whole module at once (e.g. dead function
/// elimination would be one of these, if this crate had one).
pub trait ModulePass {
    fn name(&self) -> &'static str;
    fn run_module(&mut self, module: &mut Module) -> Result<bool, Fatal>;
}

impl<P: ModulePass> Pass for P {
    fn name(&self) -> &'static str {
        ModulePass::name(self)
    }

    fn run(&mut self, module: &mut Module) -> Result<bool, Fatal> {
        self.run_module(module)
    }
}

/// A pass that operates independently on each function in the module.
pub trait FunctionPass {
    fn name(&self) -> &'static str;
    fn run_function(&mut self, func: &mut Function) -> Result<bool, Fatal>;
}

/// Blanket wrapper so a `FunctionPass` can be dropped straight into a
/// `Pipeline` built out of `Pass` objects.
pub struct PerFunction<P>(pub P);

impl<P: FunctionPass> Pass for PerFunction<P> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn run(&mut self, module: &mut Module) -> Result<bool, Fatal> {
        let mut changed = false;
        for func in &mut module.functions {
            changed |= self.0.run_function(func)?;
        }
        Ok(changed)
    }
}

/// A pass that operates independently on each block of each function.
pub trait BasicBlockPass {
    fn name(&self) -> &'static str;
    fn run_block(&mut self, func: &mut Function, block: crate::ir::BlockId) -> Result<bool, Fatal>;
}

/// Blanket wrapper so a `BasicBlockPass` can be dropped straight into a
/// `Pipeline` built out of `Pass` objects.
pub struct PerBlock<P>(pub P);

impl<P: BasicBlockPass> Pass for PerBlock<P> {
    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn run(&mut self, module: &mut Module) -> Result<bool, Fatal> {
        let mut changed = false;
        for func in &mut module.functions {
            let ids = func.blocks_in_order();
            for id in ids {
                changed |= self.0.run_block(func, id)?;
            }
        }
        Ok(changed)
    }
}

/// An ordered sequence of passes run once each, in order. The pipeline's
/// own `changed` bit is the disjunction of every member's. Pipelines may
/// nest: a `Pipeline` itself implements `Pass`.
pub struct Pipeline {
    name: &'static str,
    passes: Vec<Box<dyn Pass>>,
}

impl Pipeline {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            passes: Vec::new(),
        }
    }

    pub fn push(mut self, pass: impl Pass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Run every pass once, in order, logging each pass's `changed` bit.
    pub fn run_once(&mut self, module: &mut Module) -> Result<bool, Fatal> {
        let mut changed = false;
        for pass in &mut self.passes {
            let this_changed = pass.run(module)?;
            if this_changed {
                tracing::debug!(pass = pass.name(), "pass reported changes");
            }
            changed |= this_changed;
        }
        Ok(changed)
    }

    /// Run the whole pipeline to a fixpoint: repeat until a pass over the
    /// full sequence makes no further change, or `max_iters` is reached.
    pub fn run_to_fixpoint(&mut self, module: &mut Module, max_iters: usize) -> Result<bool, Fatal> {
        let mut any_changed = false;
        for _ in 0..max_iters {
            let changed = self.run_once(module)?;
            any_changed |= changed;
            if !changed {
                break;
            }
        }
        Ok(any_changed)
    }
}

impl Pass for Pipeline {
    fn name(&self) -> &'static str {
        self.name
    }

    fn run(&mut self, module: &mut Module) -> Result<bool, Fatal> {
        self.run_once(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rename;
    impl FunctionPass for Rename {
        fn name(&self) -> &'static str {
            "rename"
        }
        fn run_function(&mut self, func: &mut Function) -> Result<bool, Fatal> {
            func.name.push('\'');
            Ok(true)
        }
    }

    #[test]
    fn pipeline_runs_member_passes_in_order() {
        let mut module = Module::new();
        module
            .functions
            .push(Function::new(crate::ir::BlockId(0), false, "f", crate::ir::PrimType::W));
        let mut pipeline = Pipeline::new("test").push(PerFunction(Rename));
        let changed = pipeline.run_once(&mut module).unwrap();
        assert!(changed);
        assert_eq!(module.functions[0].name, "f'");
    }

    #[test]
    fn fixpoint_stops_once_no_pass_reports_change() {
        struct OnceOnly(bool);
        impl Pass for OnceOnly {
            fn name(&self) -> &'static str {
                "once"
            }
            fn run(&mut self, _module: &mut Module) -> Result<bool, Fatal> {
                let changed = !self.0;
                self.0 = true;
                Ok(changed)
            }
        }
        let mut module = Module::new();
        let mut pipeline = Pipeline::new("test").push(OnceOnly(false));
        let changed = pipeline.run_to_fixpoint(&mut module, 10).unwrap();
        assert!(changed);
    }
}

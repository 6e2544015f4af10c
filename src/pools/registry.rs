//! Category → pool registry, fixed at build time.

use std::collections::HashMap;

use tokio::runtime::{Handle, Runtime};

use crate::pools::{Admission, PoolKind, PoolSpec};
use crate::tasks::TaskCategory;

/// Runtime handle plus admission state of one category.
#[derive(Debug)]
pub(crate) struct Pool {
    pub(crate) handle: Handle,
    pub(crate) admission: Admission,
}

#[derive(Debug, Default)]
pub(crate) struct PoolRegistry {
    pools: HashMap<TaskCategory, Pool>,
}

impl PoolRegistry {
    /// Builds the registry; owned runtimes are moved out into `owned`.
    pub(crate) fn build(
        specs: impl IntoIterator<Item = (TaskCategory, PoolSpec)>,
        owned: &mut Vec<Runtime>,
    ) -> Self {
        let mut pools = HashMap::new();
        for (category, spec) in specs {
            let limit = spec.parallelism_limit();
            let handle = match spec.kind {
                PoolKind::Shared(handle) => handle,
                PoolKind::Owned(runtime) => {
                    let handle = runtime.handle().clone();
                    owned.push(runtime);
                    handle
                }
            };
            pools.insert(
                category,
                Pool {
                    handle,
                    admission: Admission::new(limit),
                },
            );
        }
        Self { pools }
    }

    pub(crate) fn contains(&self, category: &TaskCategory) -> bool {
        self.pools.contains_key(category)
    }

    pub(crate) fn get(&self, category: &TaskCategory) -> Option<&Pool> {
        self.pools.get(category)
    }

    pub(crate) fn get_mut(&mut self, category: &TaskCategory) -> Option<&mut Pool> {
        self.pools.get_mut(category)
    }
}

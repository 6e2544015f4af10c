//! # Task configuration.
//!
//! [`TaskConfig`] describes how a task is submitted: its name, category, declared
//! dependencies and resource requirements. It is consumed by
//! [`Coordinator::execute`](crate::Coordinator::execute).
//!
//! [`Configure`] is the same surface bound to a coordinator, ending in `execute`.
//!
//! ## Rules
//! - Without a name the task is called `task-<id>`.
//! - A name already used in the coordinator gets a `#2`, `#3`, ... suffix.
//! - Dependencies must come from the same coordinator.
//! - Resource shares are acquired in a stable order (by resource identity), regardless of
//!   the order they were declared in.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskcoord::{Coordinator, Config, CountableResource, TaskCategory, TaskConfig, TaskError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::new(Config::default())?;
//! let memory = Arc::new(CountableResource::new("memory", 1024));
//!
//! let load = coordinator.execute(
//!     TaskConfig::new().name("load").category(TaskCategory::Io),
//!     async { Ok::<_, TaskError>(vec![1u8, 2, 3]) },
//! )?;
//! let parse = coordinator
//!     .configure()
//!     .name("parse")
//!     .dependency(&load)
//!     .required_resource(memory, 512u64)
//!     .execute(async { Ok::<_, TaskError>(()) })?;
//!
//! coordinator.close().await?;
//! assert!(parse.has_completed());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio_util::sync::CancellationToken;

use crate::Coordinator;
use crate::error::{SubmitError, TaskError};
use crate::resources::{Claim, Resource, ShareClaim};
use crate::tasks::listener::CompletionListener;
use crate::tasks::{Handle, ResultHandle, TaskCategory};

/// How a task is submitted to a coordinator.
#[derive(Default)]
pub struct TaskConfig {
    pub(crate) name: Option<String>,
    pub(crate) category: TaskCategory,
    pub(crate) dependencies: Vec<Handle>,
    pub(crate) claims: Vec<Box<dyn Claim>>,
    pub(crate) on_completion: Vec<CompletionListener>,
    pub(crate) stop_when: Option<Arc<AtomicBool>>,
}

impl TaskConfig {
    /// Empty configuration: default category, no dependencies, no resources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the task name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the category, which selects the pool the task runs on.
    pub fn category(mut self, category: TaskCategory) -> Self {
        self.category = category;
        self
    }

    /// Declares one dependency.
    pub fn dependency(mut self, handle: impl AsRef<Handle>) -> Self {
        self.dependencies.push(handle.as_ref().clone());
        self
    }

    /// Declares several dependencies.
    pub fn dependencies<I, H>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: AsRef<Handle>,
    {
        self.dependencies
            .extend(handles.into_iter().map(|h| h.as_ref().clone()));
        self
    }

    /// Requires `share` of `resource` for the duration of the task body.
    ///
    /// The share counts as pending from submission until the task starts.
    pub fn required_resource<R, S>(mut self, resource: Arc<R>, share: S) -> Self
    where
        R: Resource<S> + ?Sized,
        S: Send + Sync + 'static,
    {
        self.claims.push(Box::new(ShareClaim::new(resource, share)));
        self
    }

    /// Stops the task on arrival, body unrun, if `flag` is set when the coordinator
    /// registers it.
    pub(crate) fn stop_when(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_when = Some(flag);
        self
    }

    pub(crate) fn with_completion(mut self, listener: CompletionListener) -> Self {
        self.on_completion.push(listener);
        self
    }
}

impl fmt::Debug for TaskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskConfig")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("dependencies", &self.dependencies.len())
            .field("resources", &self.claims.len())
            .finish()
    }
}

/// Task configuration bound to a coordinator.
///
/// Created by [`Coordinator::configure`].
pub struct Configure<'a> {
    coordinator: &'a Coordinator,
    config: TaskConfig,
}

impl<'a> Configure<'a> {
    pub(crate) fn new(coordinator: &'a Coordinator) -> Self {
        Self {
            coordinator,
            config: TaskConfig::new(),
        }
    }

    /// See [`TaskConfig::name`].
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config = self.config.name(name);
        self
    }

    /// See [`TaskConfig::category`].
    pub fn category(mut self, category: TaskCategory) -> Self {
        self.config = self.config.category(category);
        self
    }

    /// See [`TaskConfig::dependency`].
    pub fn dependency(mut self, handle: impl AsRef<Handle>) -> Self {
        self.config = self.config.dependency(handle);
        self
    }

    /// See [`TaskConfig::dependencies`].
    pub fn dependencies<I, H>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: AsRef<Handle>,
    {
        self.config = self.config.dependencies(handles);
        self
    }

    /// See [`TaskConfig::required_resource`].
    pub fn required_resource<R, S>(mut self, resource: Arc<R>, share: S) -> Self
    where
        R: Resource<S> + ?Sized,
        S: Send + Sync + 'static,
    {
        self.config = self.config.required_resource(resource, share);
        self
    }

    /// Submits a forced body. See [`Coordinator::execute`].
    pub fn execute<T, F>(self, body: F) -> Result<ResultHandle<T>, SubmitError>
    where
        T: Send + Sync + 'static,
        F: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        self.coordinator.execute(self.config, body)
    }

    /// Submits a cooperative body. See [`Coordinator::execute_cooperative`].
    pub fn execute_cooperative<T, F, Fut>(self, body: F) -> Result<ResultHandle<T>, SubmitError>
    where
        T: Send + Sync + 'static,
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        self.coordinator.execute_cooperative(self.config, body)
    }

    /// Returns the configuration without submitting it.
    pub fn into_config(self) -> TaskConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::CountableResource;

    #[test]
    fn test_setters_accumulate() {
        let memory = Arc::new(CountableResource::new("memory", 10));
        let files = Arc::new(CountableResource::new("files", 2));
        let cfg = TaskConfig::new()
            .name("load")
            .category(TaskCategory::Io)
            .required_resource(memory, 4u64)
            .required_resource(files, 1u64);

        assert_eq!(cfg.name.as_deref(), Some("load"));
        assert_eq!(cfg.category, TaskCategory::Io);
        assert_eq!(cfg.claims.len(), 2);
        assert!(cfg.dependencies.is_empty());
        assert!(cfg.stop_when.is_none());
    }

    #[test]
    fn test_stop_flag_and_listeners_are_internal() {
        let cfg = TaskConfig::new()
            .with_completion(Box::new(|| {}))
            .stop_when(Arc::new(AtomicBool::new(true)));
        assert!(cfg.stop_when.is_some());
        assert_eq!(cfg.on_completion.len(), 1);
    }
}

use crate::error::{AssetError, ResourceLoadError};
use crate::loader::ModelLoader;
use crate::model::{LoadedModel, ModelRef};
use futures::channel::oneshot;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

pub type LoadResult = Result<LoadedModel, ResourceLoadError>;

/// A model load that resolves exactly once, with either the model or the id of
/// the resource that failed.
///
/// The loader runs on a worker thread. The render thread either awaits the task
/// or polls it without blocking through [`ModelLoadTask::try_take`], so the
/// result is always applied between frames.
#[derive(Debug)]
pub struct ModelLoadTask {
    resource_id: String,
    receiver: oneshot::Receiver<LoadResult>,
    finished: bool,
}

impl ModelLoadTask {
    /// Start loading `model` on a background thread.
    pub fn spawn<L>(loader: L, model: ModelRef) -> Self
    where
        L: ModelLoader + Send + 'static,
    {
        let (sender, receiver) = oneshot::channel();
        let resource_id = model.resource_id().to_string();

        let spawned = std::thread::Builder::new()
            .name(format!("load:{resource_id}"))
            .spawn(move || {
                let result = loader.load(&model);
                if sender.send(result).is_err() {
                    tracing::debug!(geometry = %model.geometry, "load finished after task was dropped");
                }
            });
        if let Err(e) = spawned {
            // The sender went down with the closure, so the receiver resolves as canceled.
            tracing::error!("failed to start load thread for {resource_id}: {e}");
        }

        Self {
            resource_id,
            receiver,
            finished: false,
        }
    }

    /// A task that is already resolved. Useful for synchronous sources.
    pub fn ready(resource_id: impl Into<String>, result: LoadResult) -> Self {
        let (sender, receiver) = oneshot::channel();
        let _ = sender.send(result);
        Self {
            resource_id: resource_id.into(),
            receiver,
            finished: false,
        }
    }

    pub fn resource_id(&self) -> &str {
        &self.resource_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Take the result if the load has completed, without blocking.
    ///
    /// Returns `Some` exactly once; later calls return `None`.
    pub fn try_take(&mut self) -> Option<LoadResult> {
        if self.finished {
            return None;
        }
        let outcome = match self.receiver.try_recv() {
            Ok(Some(result)) => result,
            Ok(None) => return None,
            Err(oneshot::Canceled) => Err(self.canceled()),
        };
        self.finished = true;
        Some(outcome)
    }

    fn canceled(&self) -> ResourceLoadError {
        ResourceLoadError::new(self.resource_id.clone(), AssetError::Canceled)
    }
}

impl Future for ModelLoadTask {
    type Output = LoadResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.finished {
            return Poll::Ready(Err(self.canceled()));
        }
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => {
                self.finished = true;
                Poll::Ready(result)
            }
            Poll::Ready(Err(oneshot::Canceled)) => {
                self.finished = true;
                Poll::Ready(Err(self.canceled()))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::mpsc;
    use std::sync::Mutex;

    struct FixedLoader;

    impl ModelLoader for FixedLoader {
        fn load(&self, model: &ModelRef) -> Result<LoadedModel, ResourceLoadError> {
            Ok(LoadedModel::new(model.geometry.clone(), Vec::new(), BTreeMap::new()))
        }
    }

    struct FailingLoader;

    impl ModelLoader for FailingLoader {
        fn load(&self, model: &ModelRef) -> Result<LoadedModel, ResourceLoadError> {
            Err(ResourceLoadError::new(
                model.geometry.clone(),
                AssetError::EmptyGeometry,
            ))
        }
    }

    /// Blocks inside `load` until the test releases it.
    struct GatedLoader(Mutex<mpsc::Receiver<()>>);

    impl ModelLoader for GatedLoader {
        fn load(&self, model: &ModelRef) -> Result<LoadedModel, ResourceLoadError> {
            let _ = self.0.lock().unwrap().recv();
            FixedLoader.load(model)
        }
    }

    #[test]
    fn spawned_task_resolves_once() {
        let task = ModelLoadTask::spawn(FixedLoader, ModelRef::new("a.obj"));
        assert_eq!(task.resource_id(), "a.obj");
        let model = pollster::block_on(task).unwrap();
        assert_eq!(model.resource_id, "a.obj");
    }

    #[test]
    fn failure_carries_resource_id() {
        let task = ModelLoadTask::spawn(FailingLoader, ModelRef::new("broken.obj"));
        let err = pollster::block_on(task).unwrap_err();
        assert_eq!(err.resource_id, "broken.obj");
    }

    #[test]
    fn try_take_is_pending_until_loader_finishes() {
        let (release, gate) = mpsc::channel();
        let mut task =
            ModelLoadTask::spawn(GatedLoader(Mutex::new(gate)), ModelRef::new("slow.obj"));
        assert!(task.try_take().is_none());
        assert!(!task.is_finished());

        release.send(()).unwrap();
        let result = loop {
            if let Some(r) = task.try_take() {
                break r;
            }
            std::thread::yield_now();
        };
        assert!(result.is_ok());
        assert!(task.is_finished());
        assert!(task.try_take().is_none());
    }

    #[test]
    fn ready_task_resolves_immediately() {
        let mut task = ModelLoadTask::ready(
            "x.obj",
            Ok(LoadedModel::new("x.obj", Vec::new(), BTreeMap::new())),
        );
        assert!(task.try_take().unwrap().is_ok());
    }

    #[test]
    fn dropped_sender_resolves_as_canceled() {
        let (sender, receiver) = oneshot::channel::<LoadResult>();
        drop(sender);
        let mut task = ModelLoadTask {
            resource_id: "lost.obj".into(),
            receiver,
            finished: false,
        };
        let err = task.try_take().unwrap().unwrap_err();
        assert_eq!(err.resource_id, "lost.obj");
        assert!(matches!(err.source, AssetError::Canceled));
    }
}

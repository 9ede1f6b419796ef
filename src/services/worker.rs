use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{info, warn};

use crate::services::lesson_generator::{GenerationOutcome, LessonGenerator};

/// Handle for handing lesson ids to the background worker.
#[derive(Clone)]
pub struct GenerationQueue {
    sender: mpsc::UnboundedSender<String>,
}

impl GenerationQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Returns false when the worker has stopped and the job was dropped.
    pub fn enqueue(&self, lesson_id: impl Into<String>) -> bool {
        match self.sender.send(lesson_id.into()) {
            Ok(()) => true,
            Err(mpsc::error::SendError(lesson_id)) => {
                warn!("generation worker is gone; dropping job for lesson {}", lesson_id);
                false
            }
        }
    }
}

/// Background lesson generation, independent of any request lifecycle.
pub struct GenerationWorker {
    receiver: mpsc::UnboundedReceiver<String>,
    generator: LessonGenerator,
    permits: Arc<Semaphore>,
    concurrency: usize,
}

impl GenerationWorker {
    pub fn new(
        receiver: mpsc::UnboundedReceiver<String>,
        generator: LessonGenerator,
        concurrency: usize,
    ) -> Self {
        let concurrency = concurrency.max(1);
        Self {
            receiver,
            generator,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
        }
    }

    /// Creates a queue and spawns its worker on the current runtime.
    pub fn spawn(generator: LessonGenerator, concurrency: usize) -> GenerationQueue {
        let (queue, receiver) = GenerationQueue::channel();
        let worker = Self::new(receiver, generator, concurrency);
        tokio::spawn(worker.start());
        queue
    }

    /// Runs jobs until every queue handle is dropped.
    pub async fn start(mut self) {
        info!("Starting generation worker (concurrency: {})", self.concurrency);

        while let Some(lesson_id) = self.receiver.recv().await {
            let Ok(permit) = self.permits.clone().acquire_owned().await else {
                break;
            };
            let generator = self.generator.clone();

            tokio::spawn(async move {
                let _permit = permit;
                match generator.generate_for_lesson(&lesson_id).await {
                    Ok(GenerationOutcome::Generated) => {
                        info!("Background generation finished for lesson {}", lesson_id);
                    }
                    Ok(GenerationOutcome::Failed { message }) => {
                        warn!("Background generation failed for lesson {}: {}", lesson_id, message);
                    }
                    Ok(outcome) => {
                        info!("Background generation skipped for lesson {}: {:?}", lesson_id, outcome);
                    }
                    Err(e) => {
                        // the loop keeps going; the next request can retry
                        warn!("Background generation error for lesson {}: {:?}", lesson_id, e);
                    }
                }
            });
        }

        info!("Generation queue closed; worker stopping");
    }
}

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::art::Scene;
use crate::config::GenerationSettings;
use crate::encode::Encoder;
use crate::error::{PoolError, StartError, UnitFailure};
use crate::format::ImageFormat;
use crate::geometry::size_in_range;
use crate::progress::{BatchProgress, BatchReport, BatchState};
use crate::rand::Rng;
use crate::sink::Sink;

/// Runs batches of independent generate-encode-write units on a fixed worker pool.
///
/// One batch runs at a time. A batch shares a single generator between its units behind a
/// mutex; each unit takes all of its draws (format tie-break, canvas size, scene) in one critical
/// section, so with a single worker thread a seed reproduces the batch exactly.
pub struct BatchScheduler {
    encoder: Arc<dyn Encoder>,
    sink: Arc<dyn Sink>,
    pool: Arc<rayon::ThreadPool>,
    current: Mutex<Option<Arc<BatchProgress>>>,
}

impl BatchScheduler {
    /// `threads: None` sizes the pool to the available cores.
    pub fn new(
        encoder: Arc<dyn Encoder>,
        sink: Arc<dyn Sink>,
        threads: Option<usize>,
    ) -> Result<Self, PoolError> {
        Ok(BatchScheduler {
            encoder,
            sink,
            pool: Arc::new(build_thread_pool(threads)?),
            current: Mutex::new(None),
        })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Validates `settings` and dispatches `count` units in the background.
    ///
    /// The returned progress is the batch's only handle: poll it, wait on it, or cancel through
    /// it. A zero-unit batch is already [`Completed`](BatchState::Completed) on return.
    #[tracing::instrument(skip(self, settings))]
    pub fn start(
        &self,
        count: u64,
        settings: &GenerationSettings,
    ) -> Result<Arc<BatchProgress>, StartError> {
        settings.validate()?;

        let mut current = lock(&self.current);
        if let Some(running) = current.as_ref() {
            if running.state() == BatchState::Running {
                return Err(StartError::AlreadyRunning);
            }
        }
        let progress = Arc::new(BatchProgress::new(count));
        *current = Some(progress.clone());
        drop(current);

        let seed = settings.seed.unwrap_or_else(clock_seed);
        info!(
            seed = %format!("{:#018x}", seed),
            formats = %settings.formats,
            width = %settings.width,
            height = %settings.height,
            "starting batch"
        );

        if count == 0 {
            progress.finish();
            return Ok(progress);
        }

        let batch = Batch {
            settings: settings.clone(),
            rng: Mutex::new(Rng::from_seed(seed)),
            progress: progress.clone(),
            encoder: self.encoder.clone(),
            sink: self.sink.clone(),
        };
        self.pool.spawn(move || batch.run());
        Ok(progress)
    }

    /// Starts a batch and blocks until it is terminal.
    pub fn run(
        &self,
        count: u64,
        settings: &GenerationSettings,
    ) -> Result<BatchReport, StartError> {
        Ok(self.start(count, settings)?.wait())
    }

    /// Cancels the running batch, if any. A no-op when idle or already terminal.
    pub fn cancel(&self) -> bool {
        match lock(&self.current).as_ref() {
            Some(progress) => progress.cancel(),
            None => false,
        }
    }

    /// Progress of the most recently started batch.
    pub fn progress(&self) -> Option<Arc<BatchProgress>> {
        lock(&self.current).clone()
    }
}

struct Batch {
    settings: GenerationSettings,
    rng: Mutex<Rng>,
    progress: Arc<BatchProgress>,
    encoder: Arc<dyn Encoder>,
    sink: Arc<dyn Sink>,
}

/// Short-circuits the unit loop once cancellation is seen.
struct Cancelled;

impl Batch {
    fn run(self) {
        let drained = (0..self.progress.total())
            .into_par_iter()
            .try_for_each(|index| {
                if self.progress.is_cancelled() {
                    return Err(Cancelled);
                }
                self.run_unit(index);
                Ok(())
            });
        if drained.is_err() {
            debug!("stopped dispatching units after cancellation");
        }
        if let Some(report) = self.progress.finish() {
            info!(
                state = ?report.state,
                completed = report.completed,
                failed = report.failed,
                total = report.total,
                "batch finished"
            );
        }
    }

    fn run_unit(&self, index: u64) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.produce_unit(index)))
            .unwrap_or_else(|payload| Err(UnitFailure::Panicked(panic_message(payload.as_ref()))));
        let delivered = match outcome {
            Ok(()) => true,
            Err(failure) => {
                warn!(index, error = %failure, "dropping image");
                false
            }
        };
        self.progress.record_unit(delivered);
    }

    fn produce_unit(&self, index: u64) -> Result<(), UnitFailure> {
        let (format, scene) = self.draw_unit();
        debug!(
            index,
            %format,
            width = scene.size.width,
            height = scene.size.height,
            rects = scene.paints.len(),
            "generating image"
        );
        self.produce(index, format, &scene)
    }

    fn draw_unit(&self) -> (ImageFormat, Scene) {
        let mut rng = lock(&self.rng);
        let format = self.settings.formats.pick(&mut rng);
        let size = size_in_range(
            &mut rng,
            self.settings.width,
            self.settings.height,
            self.settings.min_ratio,
        );
        (format, Scene::sample(size, &mut rng))
    }

    fn produce(&self, index: u64, format: ImageFormat, scene: &Scene) -> Result<(), UnitFailure> {
        let bytes = {
            let raster = scene.render()?;
            self.encoder
                .encode(&raster, format, self.settings.jpeg_quality)?
        };
        self.sink.write(index, format, &bytes)?;
        Ok(())
    }
}

fn build_thread_pool(threads: Option<usize>) -> Result<rayon::ThreadPool, PoolError> {
    if threads == Some(0) {
        return Err(PoolError::ZeroThreads);
    }
    let mut builder =
        rayon::ThreadPoolBuilder::new().thread_name(|i| format!("imagen-worker-{}", i));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    Ok(builder.build()?)
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Guarded values stay consistent across a panicking unit.
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

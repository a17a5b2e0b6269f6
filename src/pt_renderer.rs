use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::film::Film;
use crate::scene::Scene;
use crate::stats;
use crate::task::Task;
use crate::thread_pool::ThreadPool;

mod coordinator;
mod render_worker;
pub mod tracers;

pub use self::coordinator::{Rect, RenderCoordinator};
pub use crate::config::*;
use self::render_worker::RenderWorker;

/// Renders scenes tile by tile on a shared thread pool
pub struct PTRenderer {
    pool: Arc<ThreadPool>,
}

impl PTRenderer {
    pub fn new(pool: Arc<ThreadPool>) -> PTRenderer {
        PTRenderer { pool }
    }

    pub fn pool(&self) -> &Arc<ThreadPool> {
        &self.pool
    }

    /// Queue a render and return immediately.
    /// The camera viewport is resized to the configured resolution.
    pub fn start_render(
        &self,
        scene: Arc<Scene>,
        camera: &Camera,
        config: &RenderConfig,
    ) -> Result<RenderHandle> {
        config.validate()?;
        let coordinator = RenderCoordinator::new(config);
        let film = Arc::new(Film::new(config.width, config.height));
        let mut camera = camera.clone();
        camera.update_viewport((config.width, config.height));
        let spp = config.samples_per_pixel();
        let blocks = coordinator.block_count();
        info!(
            mode = ?config.render_mode,
            width = config.width,
            height = config.height,
            spp,
            blocks,
            threads = self.pool.thread_count(),
            "render started"
        );

        let worker = RenderWorker::new(scene, camera, config.clone(), film.clone());
        let render_stats = stats::start_render();
        let started = Instant::now();
        let task = Task::new("render", blocks, move |block_i| {
            let rect = coordinator.block(block_i).ok_or_else(|| {
                Error::InvalidConfig(format!("block {} is outside the image", block_i))
            })?;
            worker.render_block(rect);
            Ok(())
        })
        .with_finisher(move || {
            let (rays, discarded) = stats::stop_render(render_stats);
            info!(
                elapsed = ?started.elapsed(),
                rays,
                discarded,
                "render finished"
            );
        });
        let task = self.pool.enqueue(task);
        Ok(RenderHandle {
            pool: self.pool.clone(),
            task,
            film,
            spp,
            tone_map: config.tone_map,
        })
    }

    /// Render to completion, helping the pool with tiles in the meantime
    pub fn render(
        &self,
        scene: Arc<Scene>,
        camera: &Camera,
        config: &RenderConfig,
    ) -> Result<Arc<Film>> {
        self.start_render(scene, camera, config)?.yield_until_done()
    }
}

/// Running or finished render
pub struct RenderHandle {
    pool: Arc<ThreadPool>,
    task: Arc<Task>,
    film: Arc<Film>,
    spp: usize,
    tone_map: bool,
}

impl RenderHandle {
    /// Drop the tiles that haven't started. Finished tiles stay on the film.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_done(&self) -> bool {
        self.task.is_done()
    }

    /// Number of finished tiles and the total
    pub fn progress(&self) -> (usize, usize) {
        (self.task.finished_count(), self.task.count())
    }

    /// Block until every tile has finished or been dropped
    pub fn wait(&self) -> Result<Arc<Film>> {
        self.task.wait()?;
        Ok(self.film.clone())
    }

    /// Like wait but renders queued tiles on the calling thread
    pub fn yield_until_done(&self) -> Result<Arc<Film>> {
        self.pool.yield_until_done(&self.task)?;
        Ok(self.film.clone())
    }

    pub fn film(&self) -> &Arc<Film> {
        &self.film
    }

    pub fn samples_per_pixel(&self) -> usize {
        self.spp
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.film.save_png(path, self.spp, self.tone_map)
    }
}

//! Render statistics: nested timers per named scene, traced ray counts
//! and discarded samples.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use prettytable::{cell, Row, Table};
use tracing::warn;

use crate::error::Result;
use crate::float::*;
use crate::intersect::Ray;

// Helper trait to print out Float type used
trait FloatName {
    fn float_name() -> String;
}

impl FloatName for f32 {
    fn float_name() -> String {
        "f32".to_string()
    }
}

impl FloatName for f64 {
    fn float_name() -> String {
        "f64".to_string()
    }
}

lazy_static::lazy_static! {
    static ref STATS: Mutex<Statistics> = Mutex::new(Statistics::new());
}

static DISCARDED: AtomicUsize = AtomicUsize::new(0);

fn stats() -> MutexGuard<'static, Statistics> {
    STATS.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn print_and_save(path: &Path) -> Result<()> {
    let table = stats().table();
    table.printstd();
    let mut stats_file = File::create(path)?;
    table.print(&mut stats_file)?;
    Ok(())
}

pub fn new_scene(name: &str) {
    stats().new_scene(name);
}

/// Start a timer nested under the running ones. Stops when the handle drops.
pub fn time(name: &str) -> TimerHandle {
    let mut stats = stats();
    let scene = stats.current_index();
    stats.scene_stats[scene].start_timer(scene, name)
}

fn stop_timer(scene: usize, timer: usize) {
    if let Some(stats) = stats().scene_stats.get_mut(scene) {
        stats.stop_timer(timer);
    }
}

/// Render timer with the counter values at its start
pub struct RenderStats {
    timer: TimerHandle,
    rays: usize,
    discarded: usize,
}

pub fn start_render() -> RenderStats {
    RenderStats {
        timer: time("Render"),
        rays: Ray::count(),
        discarded: discarded_samples(),
    }
}

/// Stop the render timer and record how much the counters grew.
/// Renders that overlap in time count each other's rays.
/// Returns the ray and discarded sample counts.
pub fn stop_render(mut render: RenderStats) -> (usize, usize) {
    render.timer.stop();
    let rays = Ray::count().wrapping_sub(render.rays);
    let discarded = discarded_samples().wrapping_sub(render.discarded);
    if let Some(scene) = stats().scene_stats.get_mut(render.timer.scene) {
        scene.ray_count = rays;
        scene.discarded = discarded;
    }
    (rays, discarded)
}

/// Count a sample dropped for being NaN or infinite.
/// Returns the running count.
pub fn discard_sample() -> usize {
    DISCARDED.fetch_add(1, Ordering::Relaxed) + 1
}

pub fn discarded_samples() -> usize {
    DISCARDED.load(Ordering::Relaxed)
}

struct Statistics {
    scene_stats: Vec<SceneStatistics>,
}

impl Statistics {
    fn new() -> Statistics {
        Statistics {
            scene_stats: Vec::new(),
        }
    }

    fn new_scene(&mut self, name: &str) {
        self.scene_stats.push(SceneStatistics::new(name));
    }

    fn current_index(&mut self) -> usize {
        if self.scene_stats.is_empty() {
            self.new_scene("default");
        }
        self.scene_stats.len() - 1
    }

    fn table(&self) -> Table {
        let mut table = Table::new();
        let first = match self.scene_stats.first() {
            Some(first) => first,
            None => return table,
        };
        let mut names = vec![cell!(Float::float_name())];
        let mut timer_rows = Vec::new();
        let mut mrps = vec![cell!("Mrays/s")];
        let mut n_rays = vec![cell!("Rays")];
        let mut discarded = vec![cell!("Discarded")];
        for (timer, l) in &first.timers {
            let mut row = Row::empty();
            row.add_cell(cell!(format!("{}{}", "| ".repeat(*l), timer.name)));
            timer_rows.push((&timer.name, row))
        }
        for stats in &self.scene_stats {
            names.push(cell!(stats.scene));
            mrps.push(cell!(stats.mrps()));
            n_rays.push(cell!(stats.ray_count));
            discarded.push(cell!(stats.discarded));
            for (name, row) in &mut timer_rows {
                let duration = stats
                    .get_timer(name)
                    .map_or_else(|| "-".to_string(), Timer::pretty_duration);
                row.add_cell(cell!(duration));
            }
        }
        table.add_row(Row::new(names));
        table.add_row(Row::new(mrps));
        for (_, row) in timer_rows {
            table.add_row(row);
        }
        table.add_row(Row::new(n_rays));
        table.add_row(Row::new(discarded));
        table
    }
}

struct SceneStatistics {
    scene: String,
    timers: Vec<(Timer, usize)>,
    active_timers: Vec<usize>,
    ray_count: usize,
    discarded: usize,
}

impl SceneStatistics {
    fn new(name: &str) -> SceneStatistics {
        SceneStatistics {
            scene: name.to_string(),
            timers: Vec::new(),
            active_timers: Vec::new(),
            ray_count: 0,
            discarded: 0,
        }
    }

    fn start_timer(&mut self, scene: usize, name: &str) -> TimerHandle {
        self.timers.push((Timer::new(name), self.active_timers.len()));
        let timer = self.timers.len() - 1;
        self.active_timers.push(timer);
        TimerHandle {
            scene,
            timer,
            active: true,
        }
    }

    /// Timers of concurrent renders may stop out of order
    fn stop_timer(&mut self, timer: usize) {
        match self.active_timers.iter().rposition(|&i| i == timer) {
            Some(pos) => {
                self.active_timers.remove(pos);
                self.timers[timer].0.stop();
            }
            None => warn!(scene = %self.scene, timer, "timer is not running"),
        }
    }

    fn get_timer(&self, name: &str) -> Option<&Timer> {
        self.timers
            .iter()
            .map(|(timer, _)| timer)
            .find(|timer| timer.name == name)
    }

    fn mrps(&self) -> String {
        let duration = match self.get_timer("Render").and_then(|t| t.duration) {
            Some(duration) => duration,
            None => return "-".to_string(),
        };
        let float_time = duration.as_secs_f64();
        if float_time == 0.0 {
            return "-".to_string();
        }
        let mrps = self.ray_count as f64 / float_time / 1_000_000.0;
        format!("{:#.2?}", mrps)
    }
}

#[derive(Clone, Debug)]
pub struct Timer {
    name: String,
    start: Instant,
    duration: Option<Duration>,
}

impl Timer {
    fn new(name: &str) -> Timer {
        Timer {
            name: name.to_string(),
            start: Instant::now(),
            duration: None,
        }
    }

    fn stop(&mut self) {
        if self.duration.is_none() {
            self.duration = Some(self.start.elapsed());
        }
    }

    fn pretty_duration(&self) -> String {
        if let Some(duration) = &self.duration {
            format!("{:#.2?}", duration)
        } else {
            format!("{:#.2?}", self.start.elapsed())
        }
    }
}

pub struct TimerHandle {
    scene: usize,
    timer: usize,
    active: bool,
}

impl TimerHandle {
    pub fn stop(&mut self) {
        if self.active {
            stop_timer(self.scene, self.timer);
            self.deactivate();
        }
    }

    // Prevent handle from stopping the timer when dropped
    fn deactivate(&mut self) {
        self.active = false;
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_timers_stop_in_order() {
        let mut scene = SceneStatistics::new("nested");
        let mut outer = scene.start_timer(0, "outer");
        let mut inner = scene.start_timer(0, "inner");
        scene.stop_timer(inner.timer);
        scene.stop_timer(outer.timer);
        assert!(scene.get_timer("inner").unwrap().duration.is_some());
        assert!(scene.get_timer("outer").unwrap().duration.is_some());
        assert_eq!(scene.timers[1].1, 1);
        assert!(scene.active_timers.is_empty());
        // Handles were not used to stop anything
        outer.deactivate();
        inner.deactivate();
    }

    #[test]
    fn interleaved_timers_stop_their_own_entry() {
        let mut scene = SceneStatistics::new("interleaved");
        let mut first = scene.start_timer(0, "Render");
        let mut second = scene.start_timer(0, "Render");
        // The first render finishes while the second is still running
        scene.stop_timer(first.timer);
        assert!(scene.timers[first.timer].0.duration.is_some());
        assert!(scene.timers[second.timer].0.duration.is_none());
        assert_eq!(scene.active_timers, vec![second.timer]);
        // Stopping twice leaves the running timer alone
        scene.stop_timer(first.timer);
        assert_eq!(scene.active_timers, vec![second.timer]);
        scene.stop_timer(second.timer);
        assert!(scene.timers[second.timer].0.duration.is_some());
        first.deactivate();
        second.deactivate();
    }

    #[test]
    fn render_counters_are_relative_to_the_start() {
        let render = start_render();
        let before = discarded_samples();
        discard_sample();
        discard_sample();
        let (_, discarded) = stop_render(render);
        // Other tests may discard samples concurrently
        assert!(discarded >= 2);
        assert!(discarded_samples() >= before + 2);
    }
}

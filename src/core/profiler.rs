//! Named CPU scope profiler
//!
//! Scopes are opened with [`Profiler::begin`] and closed with
//! [`Profiler::end`]. A scope's parent is whichever scope was open when it was
//! first begun, so the hierarchy follows call order. Each scope keeps a rolling
//! window of its most recent durations.
//!
//! ```ignore
//! profiler.begin("frame")?;
//! profiler.begin("update")?;
//! // ...
//! profiler.end("update")?;
//! profiler.end("frame")?;
//! println!("{}", profiler.report());
//! ```

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::path::Path;
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

/// Errors from unbalanced scopes or export.
#[derive(Debug, thiserror::Error)]
pub enum ProfilerError {
    #[error("scope `{0}` is already open")]
    AlreadyOpen(String),

    #[error("scope `{0}` was ended without being begun")]
    NotOpen(String),

    #[error("scope `{found}` ended while `{expected}` is the innermost open scope")]
    Mismatched { expected: String, found: String },

    #[error("failed to write profiler log: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug)]
struct Scope {
    name: String,
    parent: Option<usize>,
    depth: usize,
    children: Vec<usize>,
    samples: VecDeque<Duration>,
    started: Option<Instant>,
}

impl Scope {
    fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.samples.iter().sum::<Duration>() / self.samples.len() as u32
    }

    fn min(&self) -> Duration {
        self.samples.iter().copied().min().unwrap_or_default()
    }

    fn max(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or_default()
    }
}

/// Per-scope statistics over the sample window
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeStats {
    pub name: String,
    pub parent: Option<String>,
    pub depth: usize,
    pub average: Duration,
    pub min: Duration,
    pub max: Duration,
    pub last: Duration,
    pub samples: usize,
}

/// Hierarchical CPU profiler
#[derive(Debug)]
pub struct Profiler {
    scopes: Vec<Scope>,
    by_name: FxHashMap<String, usize>,
    /// Indices of currently open scopes, innermost last
    open: Vec<usize>,
    max_samples: usize,
}

impl Profiler {
    /// Default rolling window length
    pub const DEFAULT_SAMPLES: usize = 500;

    pub fn new(max_samples: usize) -> Self {
        Self {
            scopes: Vec::new(),
            by_name: FxHashMap::default(),
            open: Vec::new(),
            max_samples: max_samples.max(1),
        }
    }

    /// Open a named scope nested in the innermost open one
    pub fn begin(&mut self, name: &str) -> Result<(), ProfilerError> {
        self.begin_at(name, Instant::now())
    }

    /// Close the innermost scope, which must be `name`; returns its duration
    pub fn end(&mut self, name: &str) -> Result<Duration, ProfilerError> {
        self.end_at(name, Instant::now())
    }

    fn begin_at(&mut self, name: &str, now: Instant) -> Result<(), ProfilerError> {
        let index = match self.by_name.get(name) {
            Some(&index) => index,
            None => self.register(name),
        };
        let scope = &mut self.scopes[index];
        if scope.started.is_some() {
            return Err(ProfilerError::AlreadyOpen(name.to_string()));
        }
        scope.started = Some(now);
        self.open.push(index);
        Ok(())
    }

    fn end_at(&mut self, name: &str, now: Instant) -> Result<Duration, ProfilerError> {
        let Some(&innermost) = self.open.last() else {
            return Err(ProfilerError::NotOpen(name.to_string()));
        };
        if self.scopes[innermost].name != name {
            return Err(match self.by_name.get(name) {
                Some(&index) if self.scopes[index].started.is_some() => {
                    ProfilerError::Mismatched {
                        expected: self.scopes[innermost].name.clone(),
                        found: name.to_string(),
                    }
                }
                _ => ProfilerError::NotOpen(name.to_string()),
            });
        }
        self.open.pop();

        let max_samples = self.max_samples;
        let scope = &mut self.scopes[innermost];
        let elapsed = scope
            .started
            .take()
            .map_or(Duration::ZERO, |start| now.saturating_duration_since(start));
        if scope.samples.len() >= max_samples {
            scope.samples.pop_front();
        }
        scope.samples.push_back(elapsed);
        Ok(elapsed)
    }

    fn register(&mut self, name: &str) -> usize {
        let parent = self.open.last().copied();
        let depth = parent.map_or(0, |p| self.scopes[p].depth + 1);
        let index = self.scopes.len();

        self.scopes.push(Scope {
            name: name.to_string(),
            parent,
            depth,
            children: Vec::new(),
            samples: VecDeque::with_capacity(self.max_samples.min(64)),
            started: None,
        });
        if let Some(parent) = parent {
            self.scopes[parent].children.push(index);
        }
        self.by_name.insert(name.to_string(), index);
        log::trace!("Profiler scope `{name}` registered at depth {depth}");
        index
    }

    /// Names of open scopes, outermost first
    pub fn open_scopes(&self) -> impl Iterator<Item = &str> {
        self.open.iter().map(|&i| self.scopes[i].name.as_str())
    }

    pub fn max_samples(&self) -> usize {
        self.max_samples
    }

    /// Rolling average of a scope
    pub fn average(&self, name: &str) -> Option<Duration> {
        self.by_name.get(name).map(|&i| self.scopes[i].average())
    }

    pub fn stats(&self, name: &str) -> Option<ScopeStats> {
        self.by_name.get(name).map(|&i| self.stats_of(i))
    }

    fn stats_of(&self, index: usize) -> ScopeStats {
        let scope = &self.scopes[index];
        ScopeStats {
            name: scope.name.clone(),
            parent: scope.parent.map(|p| self.scopes[p].name.clone()),
            depth: scope.depth,
            average: scope.average(),
            min: scope.min(),
            max: scope.max(),
            last: scope.samples.back().copied().unwrap_or_default(),
            samples: scope.samples.len(),
        }
    }

    /// Scope indices in hierarchy order: each parent before its children
    fn hierarchy_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut stack: Vec<usize> = self
            .scopes
            .iter()
            .enumerate()
            .filter(|(_, s)| s.parent.is_none())
            .map(|(i, _)| i)
            .rev()
            .collect();

        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(self.scopes[index].children.iter().rev().copied());
        }
        order
    }

    /// Every scope's statistics in hierarchy order
    pub fn all_stats(&self) -> Vec<ScopeStats> {
        self.hierarchy_order()
            .into_iter()
            .map(|i| self.stats_of(i))
            .collect()
    }

    /// Indented human-readable summary
    pub fn report(&self) -> String {
        let mut out = String::new();
        for stats in self.all_stats() {
            let _ = writeln!(
                out,
                "{:indent$}{}: {:.3} ms (min {:.3}, max {:.3})",
                "",
                stats.name,
                millis(stats.average),
                millis(stats.min),
                millis(stats.max),
                indent = stats.depth * 2
            );
        }
        out
    }

    /// One row per scope in hierarchy order
    pub fn to_csv(&self) -> String {
        let mut out = String::from("name,parent,depth,average_ms,min_ms,max_ms,samples\n");
        for stats in self.all_stats() {
            let _ = writeln!(
                out,
                "{},{},{},{:.4},{:.4},{:.4},{}",
                stats.name,
                stats.parent.as_deref().unwrap_or(""),
                stats.depth,
                millis(stats.average),
                millis(stats.min),
                millis(stats.max),
                stats.samples
            );
        }
        out
    }

    pub fn save_csv(&self, path: impl AsRef<Path>) -> Result<(), ProfilerError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_csv())?;
        log::info!("Profiler log written to {}", path.display());
        Ok(())
    }

    /// Forget all scopes and samples
    pub fn reset(&mut self) {
        if !self.open.is_empty() {
            log::warn!("Profiler reset with {} open scope(s)", self.open.len());
        }
        self.scopes.clear();
        self.by_name.clear();
        self.open.clear();
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLES)
    }
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

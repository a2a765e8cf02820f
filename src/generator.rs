//! Random registry action generator for property-based testing
//!
//! Generates sequences of registry operations, runs them against a real
//! store (reloading it from disk before every step, the way separate CLI
//! invocations would) and against a plain in-memory reference model, and
//! reports both sides so callers can compare them.
//!
//! ## Targets instead of identifiers
//!
//! Identifiers depend on the creation clock and on collision suffixes, so a
//! generated action cannot name them up front. Actions that operate on an
//! existing issue carry a [`Target`] instead, resolved against the reference
//! model's identifiers when the step runs. `Target::Missing` always resolves
//! to an identifier that does not exist.

use crate::registry::Registry;
use crate::types::{format_date, Issue, IssueDraft};
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, TimeZone};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::path::PathBuf;

const NAMES: &[&str] = &["crash", "typo", "slow start", "login: broken", "crash"];
const MAX_URGE: u32 = 6;

/// Reference to an issue, resolved when the action runs
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// Index into the current identifiers, wrapped around their count
    Existing(usize),
    /// An identifier that is never issued
    Missing(String),
}

/// One registry operation
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryAction {
    /// Create an issue; `same_second` reuses the previous creation time
    Create {
        name: String,
        info: Option<String>,
        urge: u32,
        same_second: bool,
    },
    List,
    Get { target: Target },
    ListByMinUrgency { threshold: u32 },
    ListByExactUrgency { urge: u32 },
    Close { targets: Vec<Target> },
    DeleteById { target: Target },
    DeleteClosed,
}

impl std::fmt::Display for RegistryAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryAction::Create {
                name,
                urge,
                same_second,
                ..
            } => {
                write!(f, "create '{}' (urge:{})", name, urge)?;
                if *same_second {
                    write!(f, " same-second")?;
                }
                Ok(())
            }
            RegistryAction::List => write!(f, "list"),
            RegistryAction::Get { target } => write!(f, "get {:?}", target),
            RegistryAction::ListByMinUrgency { threshold } => write!(f, "list urge>={}", threshold),
            RegistryAction::ListByExactUrgency { urge } => write!(f, "list urge=={}", urge),
            RegistryAction::Close { targets } => write!(f, "close {:?}", targets),
            RegistryAction::DeleteById { target } => write!(f, "delete {:?}", target),
            RegistryAction::DeleteClosed => write!(f, "delete closed"),
        }
    }
}

/// Seeded generator of action sequences
pub struct ActionGenerator {
    rng: StdRng,
}

impl ActionGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate `count` actions; the first one is always a creation
    pub fn generate(&mut self, count: usize) -> Vec<RegistryAction> {
        let mut actions = Vec::with_capacity(count);
        for step in 0..count {
            let action = if step == 0 {
                self.create(false)
            } else {
                self.next_action()
            };
            actions.push(action);
        }
        actions
    }

    fn next_action(&mut self) -> RegistryAction {
        match self.rng.gen_range(0..100) {
            0..=34 => {
                let same_second = self.rng.gen_bool(0.2);
                self.create(same_second)
            }
            35..=44 => RegistryAction::List,
            45..=52 => RegistryAction::Get {
                target: self.target(),
            },
            53..=59 => RegistryAction::ListByMinUrgency {
                threshold: self.rng.gen_range(0..=MAX_URGE),
            },
            60..=66 => RegistryAction::ListByExactUrgency {
                urge: self.rng.gen_range(0..=MAX_URGE),
            },
            67..=81 => {
                let count = self.rng.gen_range(1..=3);
                RegistryAction::Close {
                    targets: (0..count).map(|_| self.target()).collect(),
                }
            }
            82..=91 => RegistryAction::DeleteById {
                target: self.target(),
            },
            _ => RegistryAction::DeleteClosed,
        }
    }

    fn create(&mut self, same_second: bool) -> RegistryAction {
        let name = NAMES[self.rng.gen_range(0..NAMES.len())].to_string();
        let info = if self.rng.gen_bool(0.7) {
            Some(format!("details {}", self.rng.gen_range(0..1000)))
        } else {
            None
        };
        RegistryAction::Create {
            name,
            info,
            urge: self.rng.gen_range(0..=MAX_URGE),
            same_second,
        }
    }

    fn target(&mut self) -> Target {
        if self.rng.gen_bool(0.85) {
            Target::Existing(self.rng.gen_range(0..64))
        } else {
            Target::Missing(format!("1999-01-01 00:00:{:02}", self.rng.gen_range(0..60)))
        }
    }
}

/// In-memory model of what the registry should contain
#[derive(Debug, Default)]
pub struct ReferenceInterpreter {
    issues: BTreeMap<String, Issue>,
}

impl ReferenceInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(&self, target: &Target) -> String {
        match target {
            Target::Existing(index) if !self.issues.is_empty() => self
                .issues
                .keys()
                .nth(index % self.issues.len())
                .cloned()
                .unwrap_or_default(),
            Target::Existing(_) => "1999-12-31 23:59:59".to_string(),
            Target::Missing(id) => id.clone(),
        }
    }

    /// Snapshot of the modelled issues in registry order
    pub fn snapshot(&self) -> Vec<Issue> {
        self.issues.values().cloned().collect()
    }

    /// Apply an action, given the identifier the real registry assigned to
    /// a creation, and return the rendered output lines
    pub fn apply(
        &mut self,
        action: &RegistryAction,
        created_id: Option<&str>,
        date: &str,
    ) -> Result<Vec<String>> {
        let output = match action {
            RegistryAction::Create {
                name, info, urge, ..
            } => {
                let id = created_id.context("creation produced no identifier")?;
                anyhow::ensure!(
                    id.starts_with(date),
                    "identifier {} does not start with creation date {}",
                    id,
                    date
                );
                anyhow::ensure!(
                    !self.issues.contains_key(id),
                    "identifier {} overwrote an existing issue",
                    id
                );
                let mut issue = Issue::new(id.to_string(), name.clone(), date.to_string());
                issue.info = info.clone();
                issue.urge = *urge;
                let line = render(&issue);
                self.issues.insert(id.to_string(), issue);
                vec![line]
            }
            RegistryAction::List => {
                let mut issues: Vec<&Issue> = self.issues.values().collect();
                // Stable: equal urgencies keep identifier order
                issues.sort_by_key(|i| std::cmp::Reverse(i.urge));
                issues.into_iter().map(render).collect()
            }
            RegistryAction::Get { target } => {
                let id = self.resolve(target);
                self.issues.get(&id).map(render).into_iter().collect()
            }
            RegistryAction::ListByMinUrgency { threshold } => self
                .issues
                .values()
                .filter(|i| i.urge >= *threshold)
                .map(render)
                .collect(),
            RegistryAction::ListByExactUrgency { urge } => self
                .issues
                .values()
                .filter(|i| i.urge == *urge)
                .map(render)
                .collect(),
            RegistryAction::Close { targets } => {
                let ids: Vec<String> = targets.iter().map(|t| self.resolve(t)).collect();
                let mut closed = Vec::new();
                for id in ids {
                    if let Some(issue) = self.issues.get_mut(&id) {
                        issue.closed = true;
                        closed.push(issue.name.clone());
                    }
                }
                closed
            }
            RegistryAction::DeleteById { target } => {
                let id = self.resolve(target);
                match self.issues.remove(&id) {
                    Some(_) => vec![id],
                    None => Vec::new(),
                }
            }
            RegistryAction::DeleteClosed => {
                let ids: Vec<String> = self
                    .issues
                    .values()
                    .filter(|i| i.closed)
                    .map(|i| i.id.clone())
                    .collect();
                for id in &ids {
                    self.issues.remove(id);
                }
                ids
            }
        };
        Ok(output)
    }
}

/// Both sides of one executed step
#[derive(Debug)]
pub struct StepOutcome {
    pub expected_output: Vec<String>,
    pub actual_output: Vec<String>,
    pub expected: Vec<Issue>,
    pub actual: Vec<Issue>,
}

/// Runs actions against a real store next to the reference model
pub struct ActionExecutor {
    base_dir: PathBuf,
    reference: ReferenceInterpreter,
    clock: DateTime<Local>,
}

impl ActionExecutor {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let clock = Local
            .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
            .single()
            .unwrap_or_else(Local::now);
        Self {
            base_dir: base_dir.into(),
            reference: ReferenceInterpreter::new(),
            clock,
        }
    }

    pub fn reference(&self) -> &ReferenceInterpreter {
        &self.reference
    }

    /// Execute one action on a freshly loaded registry
    pub fn step(&mut self, action: &RegistryAction) -> Result<StepOutcome> {
        let mut registry = Registry::load(&self.base_dir).context("Failed to load registry")?;
        let mut created_id = None;

        let actual_output = match action {
            RegistryAction::Create {
                name,
                info,
                urge,
                same_second,
            } => {
                if !same_second {
                    self.clock += Duration::seconds(1);
                }
                let mut draft = IssueDraft::new(name.clone()).with_urge(*urge);
                draft.info = info.clone();
                let issue = registry.create(draft, self.clock)?;
                created_id = Some(issue.id.clone());
                vec![render(issue)]
            }
            RegistryAction::List => registry.list().into_iter().map(render).collect(),
            RegistryAction::Get { target } => {
                let id = self.reference.resolve(target);
                registry.get(&id).map(render).into_iter().collect()
            }
            RegistryAction::ListByMinUrgency { threshold } => registry
                .list_by_min_urgency(*threshold)
                .into_iter()
                .map(render)
                .collect(),
            RegistryAction::ListByExactUrgency { urge } => registry
                .list_by_exact_urgency(*urge)
                .into_iter()
                .map(render)
                .collect(),
            RegistryAction::Close { targets } => {
                let ids: Vec<String> = targets.iter().map(|t| self.reference.resolve(t)).collect();
                registry.close(ids.as_slice())?
            }
            RegistryAction::DeleteById { target } => {
                let id = self.reference.resolve(target);
                if registry.delete_by_id(&id)? {
                    vec![id]
                } else {
                    Vec::new()
                }
            }
            RegistryAction::DeleteClosed => registry.delete_closed()?,
        };

        let date = format_date(self.clock);
        let expected_output = self
            .reference
            .apply(action, created_id.as_deref(), &date)
            .with_context(|| format!("reference rejected '{}'", action))?;

        let reloaded = Registry::load(&self.base_dir).context("Failed to reload registry")?;
        anyhow::ensure!(
            reloaded.skipped().is_empty(),
            "store holds unreadable records: {:?}",
            reloaded.skipped()
        );

        Ok(StepOutcome {
            expected_output,
            actual_output,
            expected: self.reference.snapshot(),
            actual: reloaded.iter().cloned().collect(),
        })
    }
}

fn render(issue: &Issue) -> String {
    format!(
        "{} {} urge={} closed={}",
        issue.id, issue.name, issue.urge, issue.closed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = ActionGenerator::new(7).generate(50);
        let b = ActionGenerator::new(7).generate(50);
        assert_eq!(a, b);
        assert!(matches!(a[0], RegistryAction::Create { same_second: false, .. }));
    }

    #[test]
    fn test_resolve_on_empty_model_is_missing() {
        let reference = ReferenceInterpreter::new();
        let id = reference.resolve(&Target::Existing(3));
        assert!(reference.snapshot().iter().all(|i| i.id != id));
    }
}

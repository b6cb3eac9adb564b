//! `release`: test, pack, push and tag in order

use crate::registry::TaskRegistrar;
use crate::task::TaskDefinition;

/// Steps of a release, run one after another
pub const RELEASE_STEPS: &[&str] = &["test", "pack", "push", "tag", "push-tags"];

pub fn register(registrar: &mut TaskRegistrar<'_>) {
    let release = RELEASE_STEPS.iter().fold(
        TaskDefinition::new("release").with_help("Test, pack, push and tag a release"),
        |task, step| task.with_depends_on(*step),
    );
    registrar.task(release);
}

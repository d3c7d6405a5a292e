use bevy::prelude::*;
use std::fs;
use std::path::PathBuf;
use unit_game::gameplay::BoardSettings;

/// Finds scenario files on disk and, when `SCENARIO` names one of them,
/// points the board at it before gameplay starts.
pub struct ScenarioPlugin {
    root: PathBuf,
}

impl ScenarioPlugin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for ScenarioPlugin {
    fn default() -> Self {
        Self {
            root: PathBuf::from("scenarios"),
        }
    }
}

impl Plugin for ScenarioPlugin {
    fn build(&self, app: &mut App) {
        let registry = ScenarioRegistry::discover(self.root.clone());
        if let Some(path) = registry.active_path() {
            if !app.world().contains_resource::<BoardSettings>() {
                app.insert_resource(BoardSettings {
                    scenario: Some(path),
                    ..BoardSettings::from_env()
                });
            }
        }
        app.insert_resource(registry)
            .add_systems(Startup, log_scenarios);
    }
}

#[derive(Resource, Debug)]
pub struct ScenarioRegistry {
    pub root: PathBuf,
    pub available: Vec<String>,
    pub active: Option<String>,
}

impl ScenarioRegistry {
    fn discover(root: PathBuf) -> Self {
        let mut available = Vec::new();
        if let Ok(entries) = fs::read_dir(&root) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        available.push(stem.to_string());
                    }
                }
            }
        }

        available.sort();
        let env_active = std::env::var("SCENARIO").ok();
        let active = env_active
            .as_ref()
            .and_then(|name| available.iter().find(|candidate| candidate == &name))
            .cloned();

        Self {
            root,
            available,
            active,
        }
    }

    fn active_path(&self) -> Option<PathBuf> {
        self.active
            .as_ref()
            .map(|name| self.root.join(format!("{name}.toml")))
    }
}

fn log_scenarios(registry: Res<ScenarioRegistry>) {
    if registry.available.is_empty() {
        info!(
            target: "scenario",
            "No scenarios under {}. Add a <name>.toml lineup there",
            registry.root.display()
        );
        return;
    }

    info!(
        target: "scenario",
        "Scenarios: {:?} (active: {})",
        registry.available,
        registry
            .active
            .as_deref()
            .unwrap_or("generated lineup (set SCENARIO)"),
    );
}

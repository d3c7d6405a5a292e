mod scenario;

use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::window::{PresentMode, WindowResolution};
use scenario::ScenarioPlugin;
use unit_game::ui::UiPlugin;
use unit_game::UnitGamePlugin;

const DEFAULT_SCENARIO_DIR: &str = "scenarios";

fn main() {
    let scenarios = ScenarioPlugin::new(
        std::env::var("SCENARIO_DIR").unwrap_or_else(|_| DEFAULT_SCENARIO_DIR.into()),
    );

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(board_window()),
                    ..default()
                })
                .set(AssetPlugin {
                    watch_for_changes_override: Some(cfg!(feature = "native_hot_reload")),
                    ..default()
                }),
        )
        .add_plugins((scenarios, UnitGamePlugin, UiPlugin))
        .run();
}

/// Titled after the selected scenario so side-by-side runs are told apart.
fn board_window() -> Window {
    let title = match std::env::var("SCENARIO") {
        Ok(name) if !name.is_empty() => format!("Tactics Board - {name}"),
        _ => "Tactics Board".to_owned(),
    };
    Window {
        title,
        present_mode: PresentMode::AutoVsync,
        resolution: WindowResolution::new(1280.0, 720.0),
        resizable: true,
        ..default()
    }
}

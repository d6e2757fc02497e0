//! Command dispatch and logging setup.

use crate::errors::AppError;
use crate::{Command, WindowArgs};
use cloudlod_data::{CloudStats, PointStore, ReadWindow, StoreOptions, is_point_file};
use cloudlod_index::{IndexConfig, LodIndex, LodSpec, PickMode, PickQuery, PickTarget, Ray};
use glam::DVec3;
use serde_json::json;
use std::path::Path;
use tracing::{info, warn};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Install the fmt subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(config: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.level)),
        )
        .with_target(false)
        .init();
}

/// Parse `x,y,z` into a vector.
pub fn parse_vec3(s: &str) -> Result<DVec3, AppError> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| AppError::BadVector(s.to_string()))?;
    match parts.as_slice() {
        &[x, y, z] => Ok(DVec3::new(x, y, z)),
        _ => Err(AppError::BadVector(s.to_string())),
    }
}

fn parse_mode(s: &str) -> Result<PickMode, AppError> {
    match s.to_ascii_lowercase().as_str() {
        "points" => Ok(PickMode::Points),
        "bounds" => Ok(PickMode::Bounds),
        _ => Err(AppError::BadMode(s.to_string())),
    }
}

fn open_store(path: &Path, window: WindowArgs) -> Result<PointStore, AppError> {
    if !is_point_file(path) {
        warn!("{} does not have the point file extension", path.display());
    }
    let window = ReadWindow::full()
        .with_start(window.start)
        .with_length(window.length)
        .with_decimation(window.decimation);
    Ok(PointStore::open_with(
        path,
        &StoreOptions::default().with_window(window),
    )?)
}

/// Run one command, printing its result to stdout.
pub fn run(command: Command) -> Result<(), AppError> {
    match command {
        Command::Info { file, window } => {
            let store = open_store(&file, window)?;
            println!("{}", CloudStats::from_store(&store).to_json()?);
        }
        Command::Lod { options } => {
            let spec: LodSpec = options.parse()?;
            println!("{}", spec);
        }
        Command::Pick {
            file,
            options,
            origin,
            dir,
            reference,
            max_distance,
            radius,
            mode,
            window,
        } => {
            let mode = parse_mode(&mode)?;
            let spec: LodSpec = options.parse()?;
            let ray = Ray::new(origin, dir)?;

            let mut query = PickQuery::default();
            if let Some(max_distance) = max_distance {
                query = query.with_max_distance(max_distance);
            }
            if let Some(radius) = radius {
                query = query.with_pick_radius(radius);
            }
            query.validate()?;

            let mut config = IndexConfig::default();
            if let Some(reference) = reference {
                config = config.with_reference(reference);
            }

            let store = open_store(&file, window)?;
            let index = LodIndex::build(&store, &spec, &config)?;
            info!(
                "Indexed {} of {} points in {} cells",
                index.retained_count(),
                store.len(),
                index.cells().len()
            );

            let hit = PickTarget::new(&index, mode).pick(&ray, &query)?;
            let color = match hit.point_index {
                Some(i) => Some(store.get(i)?.rgba()),
                None => None,
            };
            let report = json!({
                "found": hit.found,
                "position": [hit.position.x, hit.position.y, hit.position.z],
                "distance": hit.distance,
                "point_index": hit.point_index,
                "rgba": color,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vec3() {
        assert_eq!(parse_vec3("1,-2.5, 3").unwrap(), DVec3::new(1.0, -2.5, 3.0));
        assert!(matches!(parse_vec3("1,2"), Err(AppError::BadVector(_))));
        assert!(matches!(parse_vec3("1,2,z"), Err(AppError::BadVector(_))));
    }

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode("Points").unwrap(), PickMode::Points);
        assert_eq!(parse_mode("bounds").unwrap(), PickMode::Bounds);
        assert!(parse_mode("mesh").is_err());
    }
}

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use geo_utils::{
    codec::from_feature,
    export::{parse_upload, uploaded_features},
};
use shape_sync::{
    AppContext, GeoStore, HttpStore, MapSurface, MemorySurface, Session, SyncController, SyncError,
};

/// Keep drawn shapes in sync with a GeoJSON server from the command line
#[derive(Parser, Debug)]
#[command(name = "geoscribe", version, about, long_about = None)]
struct Args {
    /// Base URL of the geodata server
    #[arg(long, env = "GEOSCRIBE_SERVER", default_value = "http://localhost:8080")]
    server: String,

    /// Where the logged-in user is remembered between runs
    #[arg(long, env = "GEOSCRIBE_SESSION", default_value = "geoscribe-session.json")]
    session: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every stored shape
    List,
    /// Write every stored shape to one FeatureCollection file
    Export {
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Save every feature of a .geojson or .kml file as a new shape
    Import { file: PathBuf },
    /// Delete a stored shape by id
    Delete { id: String },
    Login { name: String },
    Logout,
}

type Controller = SyncController<HttpStore, MemorySurface>;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut session = Session::load(&args.session)
        .with_context(|| format!("reading session {}", args.session.display()))?;

    match &args.command {
        Command::Login { name } => {
            session.login(name.as_str());
            session.save(&args.session)?;
            println!("{}", session.greeting());
            return Ok(());
        }
        Command::Logout => {
            session.logout();
            session.save(&args.session)?;
            println!("{}", session.greeting());
            return Ok(());
        }
        _ => {}
    }

    println!("{}", session.greeting());
    if session.user().is_none() {
        bail!("log in first with `geoscribe login NAME`");
    }

    let controller = Controller::connect(
        AppContext::new(session, args.server.as_str()),
        MemorySurface::new(),
    );
    controller
        .mount()
        .await
        .with_context(|| format!("loading shapes from {}", args.server))?;

    match args.command {
        Command::List => list(&controller),
        Command::Export { out } => export(&controller, out),
        Command::Import { file } => import(&controller, &file).await,
        Command::Delete { id } => delete(&controller, &id).await,
        Command::Login { .. } | Command::Logout => Ok(()),
    }
}

fn list(controller: &Controller) -> Result<()> {
    let surface = controller.surface();
    let registry = controller.registry();
    for (id, key) in registry.iter() {
        if let Some(layer) = surface.layer(key) {
            println!("{id}\t{}", layer.shape.kind());
        }
    }
    println!("{} shape(s)", registry.len());
    Ok(())
}

fn export(controller: &Controller, out: Option<PathBuf>) -> Result<()> {
    let file = controller.export_all();
    let path = out.unwrap_or_else(|| PathBuf::from(&file.filename));
    std::fs::write(&path, file.contents).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {} shape(s) to {}", controller.registry().len(), path.display());
    Ok(())
}

async fn import(controller: &Controller, file: &Path) -> Result<()> {
    let filename = file.to_string_lossy();
    let text =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let upload = parse_upload(&filename, &text)?;

    let (saved, result) = save_upload(controller, &upload).await;
    for id in &saved {
        println!("Saved {id}");
    }
    println!("Imported {} shape(s) from {}", saved.len(), file.display());
    result.with_context(|| format!("importing {}", file.display()))
}

/// Create every readable feature of `upload` in turn, stopping at the first
/// failed create. Returns the ids saved before any failure.
async fn save_upload<S: GeoStore>(
    controller: &SyncController<S, MemorySurface>,
    upload: &serde_json::Value,
) -> (Vec<String>, Result<(), SyncError>) {
    let mut saved = Vec::new();
    for feature in uploaded_features(upload) {
        let layer = match from_feature(&feature) {
            Ok(layer) => layer,
            Err(e) => {
                log::warn!("Skipping feature: {e}");
                continue;
            }
        };
        let key = controller.surface_mut().add_layer(layer);
        match controller.shape_drawn(key).await {
            Ok(id) => saved.push(id),
            Err(e) => return (saved, Err(e)),
        }
    }
    (saved, Ok(()))
}

async fn delete(controller: &Controller, id: &str) -> Result<()> {
    let Some(key) = controller.registry().get(id) else {
        bail!("no shape with id {id}");
    };
    controller.shapes_deleted(&[key]).await?;
    println!("Deleted {id}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shape_sync::StoreError;

    #[test]
    fn parses_commands() {
        let args = Args::try_parse_from(["geoscribe", "export", "--out", "all.geojson"]).unwrap();
        assert!(matches!(args.command, Command::Export { out: Some(_) }));

        let args = Args::try_parse_from(["geoscribe", "--server", "http://x", "delete", "a1"]).unwrap();
        assert_eq!(args.server, "http://x");
        assert!(matches!(args.command, Command::Delete { id } if id == "a1"));
    }

    /// Accepts `capacity` creates, then answers 503.
    struct FillingStore {
        capacity: usize,
        created: std::cell::Cell<usize>,
    }

    impl GeoStore for FillingStore {
        async fn list_all(&self) -> Result<Vec<geo_utils::Record>, StoreError> {
            Ok(Vec::new())
        }

        async fn create(
            &self,
            feature: &geojson::Feature,
        ) -> Result<geo_utils::Record, StoreError> {
            let n = self.created.get();
            if n == self.capacity {
                return Err(StoreError::Server {
                    status: 503,
                    body: String::new(),
                });
            }
            self.created.set(n + 1);
            Ok(geo_utils::Record::new(format!("s{n}"), feature))
        }

        async fn update(&self, _: &str, _: &geojson::Feature) -> Result<(), StoreError> {
            Ok(())
        }

        async fn delete(&self, _: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn points(n: usize) -> serde_json::Value {
        let features: Vec<_> = (0..n)
            .map(|i| {
                serde_json::json!({
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [i as f64, 0.0]},
                    "properties": {}
                })
            })
            .collect();
        serde_json::json!({"type": "FeatureCollection", "features": features})
    }

    #[tokio::test]
    async fn failed_import_reports_what_was_saved() {
        let controller = SyncController::new(
            AppContext::new(Session::default(), "http://localhost:8080"),
            FillingStore {
                capacity: 2,
                created: Default::default(),
            },
            MemorySurface::new(),
        );
        controller.mount().await.unwrap();

        let (saved, result) = save_upload(&controller, &points(4)).await;

        assert_eq!(saved, vec!["s0", "s1"]);
        assert!(matches!(
            result,
            Err(SyncError::Store(StoreError::Server { status: 503, .. }))
        ));
        assert_eq!(controller.registry().len(), 2);
    }

    #[tokio::test]
    async fn import_saves_every_feature() {
        let controller = SyncController::new(
            AppContext::new(Session::default(), "http://localhost:8080"),
            FillingStore {
                capacity: 10,
                created: Default::default(),
            },
            MemorySurface::new(),
        );

        let (saved, result) = save_upload(&controller, &points(3)).await;

        assert_eq!(saved.len(), 3);
        assert!(result.is_ok());
    }

    #[test]
    fn import_needs_a_file() {
        assert!(Args::try_parse_from(["geoscribe", "import"]).is_err());
    }
}

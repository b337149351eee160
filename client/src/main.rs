use clap::Parser;
use client::connection::{self, ConnectionEvent};
use client::engine::{Engine, InputEvent};
use log::info;
use rand::Rng;
use shared::{Message, Position, Tile};
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// Headless demo driver for the board client. Connects to the relay,
/// resyncs, and optionally creates one tile and drags it along a scripted
/// path so two running instances visibly synchronize.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay WebSocket URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Create a tile with this label after the initial sync
    #[arg(short = 'a', long)]
    add: Option<String>,

    /// Drag the created tile diagonally after creation
    #[arg(short = 'd', long)]
    drag: bool,

    /// Number of pointer samples in the scripted drag
    #[arg(long, default_value = "30")]
    drag_steps: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    info!("Connecting to relay at {}", args.url);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<ConnectionEvent>();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Message>();
    let (input_tx, input_rx) = mpsc::unbounded_channel::<InputEvent>();

    tokio::spawn(connection::run_transport(
        args.url.clone(),
        event_tx,
        outbound_rx,
    ));

    let engine = Engine::new(outbound_tx);
    let engine_task = tokio::spawn(engine.run(event_rx, input_rx));

    if let Some(label) = args.add {
        // Give the initial resync a moment to land first.
        sleep(Duration::from_millis(500)).await;

        // Random placement, like dropping a fresh magnet on the board.
        let position = {
            let mut rng = rand::thread_rng();
            Position::new(rng.gen_range(0.0..800.0), rng.gen_range(0.0..600.0))
        };
        let tile = Tile::new(label, position);
        let tile_id = tile.id.clone();
        info!(
            "Creating tile {:?} ({}) at ({:.0}, {:.0})",
            tile.label, tile.id, tile.x, tile.y
        );
        input_tx.send(InputEvent::CreateTile(tile))?;

        if args.drag {
            sleep(Duration::from_millis(200)).await;
            info!("Scripted drag: {} samples", args.drag_steps);

            input_tx.send(InputEvent::PointerDown {
                tile_id,
                x: position.x,
                y: position.y,
            })?;
            for step in 1..=args.drag_steps {
                input_tx.send(InputEvent::PointerMove {
                    x: position.x + step as f32 * 4.0,
                    y: position.y + step as f32 * 3.0,
                })?;
                sleep(Duration::from_millis(16)).await;
            }
            input_tx.send(InputEvent::PointerUp)?;
            info!("Drag finished");
        }
    }

    info!("Running; press Ctrl-C to exit");
    tokio::signal::ctrl_c().await?;
    drop(input_tx);
    engine_task.abort();
    Ok(())
}

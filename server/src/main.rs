use clap::Parser;
use log::{error, info};
use server::config::Args;
use server::context::ServerContext;
use server::network::Server;
use server::persistence::Persistence;
use server::sprites::load_sprites;
use shared::World;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Main-method of the application.
/// Restores the stored world, then serves connections until Ctrl+C and saves
/// the world one last time on the way out.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let sprites = load_sprites(args.sprites_file.as_deref());
    let context = Arc::new(ServerContext::new(
        World::default(),
        sprites,
        Persistence::new(&args.data_file),
    ));

    // The world must be in place before the first connection is accepted
    context.restore_from_disk().await;

    let listener = TcpListener::bind(args.address()).await?;
    let server = Arc::new(
        Server::new(Arc::clone(&context), &args.index_file)
            .with_outbound_buffer(usize::from(args.outbound_buffer)),
    );

    server
        .run(listener, async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C, shutting down gracefully..."),
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        })
        .await?;

    match context.save_now().await {
        Ok(()) => info!("World saved to {}", args.data_file.display()),
        Err(e) => error!("Failed to save world on shutdown: {}", e),
    }

    Ok(())
}

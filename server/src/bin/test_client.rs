use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use shared::{ClientMessage, ServerMessage};
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

#[derive(Parser, Debug)]
#[command(author, version, about = "Scripted WebSocket client for the presence server")]
struct Args {
    /// Server URL
    #[arg(short, long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,

    /// Sprite to join with
    #[arg(short, long, default_value = "mage")]
    sprite: String,

    /// Moves to send, one letter each (u/d/l/r)
    #[arg(short, long, default_value = "rrddlluu")]
    moves: String,

    /// Pause between moves in milliseconds
    #[arg(short, long, default_value = "250")]
    pause: u64,
}

fn direction(letter: char) -> Option<&'static str> {
    match letter {
        'u' => Some("up"),
        'd' => Some("down"),
        'l' => Some("left"),
        'r' => Some("right"),
        _ => None,
    }
}

fn describe(message: &ServerMessage) -> String {
    match message {
        ServerMessage::SpritesResponse { sprites } => format!("{} sprite(s) available", sprites.len()),
        ServerMessage::WorldState { players } => format!("world has {} player(s)", players.len()),
        ServerMessage::PlayerJoined { player } => format!(
            "{} joined at ({:.0}, {:.0}) as {}",
            player.id, player.x, player.y, player.sprite_key
        ),
        ServerMessage::PlayerMoved { player } => {
            format!("{} moved to ({:.0}, {:.0})", player.id, player.x, player.y)
        }
        ServerMessage::PlayerLeft { player_id } => format!("{} left", player_id),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    println!("Connecting to {}", args.url);
    let (ws, _) = connect_async(args.url.as_str()).await?;
    let (mut write, mut read) = ws.split();

    let reader = tokio::spawn(async move {
        while let Some(Ok(frame)) = read.next().await {
            if let Message::Text(text) = frame {
                match ServerMessage::decode(&text) {
                    Ok(message) => println!("<- {}", describe(&message)),
                    Err(e) => println!("<- undecodable message: {}", e),
                }
            }
        }
    });

    let mut script = vec![
        ClientMessage::RequestSprites,
        ClientMessage::PlayerJoin {
            sprite: Some(args.sprite.clone()),
        },
    ];
    script.extend(args.moves.chars().filter_map(direction).map(|d| {
        ClientMessage::PlayerMove {
            direction: d.to_string(),
        }
    }));

    for message in script {
        println!("-> {:?}", message);
        write.send(Message::Text(message.encode()?)).await?;
        sleep(Duration::from_millis(args.pause)).await;
    }

    write.send(Message::Close(None)).await?;
    let _ = timeout(Duration::from_secs(2), reader).await;

    println!("Test client finished");
    Ok(())
}

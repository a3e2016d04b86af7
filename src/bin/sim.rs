use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use hexhaven::game::{Game, GameConfig};
use hexhaven::players::{BasePlayer, GreedyPlayer, RandomPlayer};
use hexhaven::types::Color;
use hexhaven::Action;

#[derive(Debug, Parser, Clone)]
#[command(name = "hexhaven-sim")]
#[command(about = "Simulate bot games on the hexhaven rules engine")]
struct Args {
    /// Number of games to play
    #[arg(short = 'n', long, default_value_t = 5)]
    num: u32,

    /// Comma-separated player codes (G=Greedy, R=Random), e.g. G,R,G,R
    #[arg(long, default_value = "G,G,G,G")]
    players: String,

    /// Random seed for reproducibility; game i uses seed + i
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Board radius (2 = the classic 19-hex board)
    #[arg(long, default_value_t = 2)]
    radius: u8,

    /// Victory points needed to win
    #[arg(long, default_value_t = 10)]
    vps_to_win: u8,

    /// Write the final state of the last game to this snapshot file
    #[arg(long)]
    save: Option<PathBuf>,

    /// Silence per-game output
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone)]
enum BotPlayer {
    Greedy(GreedyPlayer),
    Random(RandomPlayer),
}

impl BasePlayer for BotPlayer {
    fn decide(&self, game: &Game, actions: &[Action]) -> Option<Action> {
        match self {
            BotPlayer::Greedy(bot) => bot.decide(game, actions),
            BotPlayer::Random(bot) => bot.decide(game, actions),
        }
    }
}

fn main() {
    let args = Args::parse();

    let codes: Vec<&str> = args.players.split(',').collect();
    if !(2..=4).contains(&codes.len()) {
        eprintln!("Error: specify 2-4 players");
        std::process::exit(1);
    }
    let mut players = Vec::new();
    for code in &codes {
        match code.trim().to_ascii_uppercase().as_str() {
            "G" => players.push(BotPlayer::Greedy(GreedyPlayer)),
            "R" => players.push(BotPlayer::Random(RandomPlayer)),
            other => {
                eprintln!("Error: unknown player code '{other}' (use G or R)");
                std::process::exit(1);
            }
        }
    }

    let mut wins: HashMap<Color, u32> = HashMap::new();
    let mut stalls = 0u32;
    let mut total_turns = 0u64;

    for game_index in 0..args.num {
        let config = GameConfig {
            num_players: players.len(),
            radius: args.radius,
            vps_to_win: args.vps_to_win,
            seed: args.seed + game_index as u64,
        };
        let mut game = match Game::new(config) {
            Ok(game) => game,
            Err(err) => {
                eprintln!("Error: {err}");
                std::process::exit(1);
            }
        };
        let winner = game.play(&players);
        total_turns += game.state.turn as u64;

        match winner {
            Some(color) => {
                *wins.entry(color).or_insert(0) += 1;
                if !args.quiet {
                    println!(
                        "game {:>3}: {} wins after {} turns",
                        game_index + 1,
                        color,
                        game.state.turn
                    );
                }
            }
            None => {
                stalls += 1;
                if !args.quiet {
                    println!(
                        "game {:>3}: no winner after {} turns",
                        game_index + 1,
                        game.state.turn
                    );
                }
            }
        }

        if game_index + 1 == args.num {
            if let Some(path) = &args.save {
                if let Err(err) = game.state.save_to_path(path) {
                    eprintln!("Error: could not save snapshot: {err}");
                    std::process::exit(1);
                }
                println!("saved final state to {}", path.display());
            }
        }
    }

    println!("{}", "-".repeat(40));
    for (index, color) in Color::ORDERED.iter().take(players.len()).enumerate() {
        let count = wins.get(color).copied().unwrap_or(0);
        println!(
            "{} ({}): {:>3} wins",
            color,
            codes[index].trim().to_ascii_uppercase(),
            count
        );
    }
    if stalls > 0 {
        println!("stalled games: {stalls}");
    }
    println!(
        "average turns per game: {:.1}",
        total_turns as f64 / args.num.max(1) as f64
    );
}

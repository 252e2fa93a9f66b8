// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and routes to Layer 2.
//
//   train ir | rnn  — train a guesser, save its artifacts
//   guess ir | rnn  — load a guesser, print ranked answers
//
// Guess output is one line per guess: `rank page score`,
// with a blank line between questions.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GuessTarget, TrainTarget};

use crate::application::guess_use_case::GuessUseCase;
use crate::application::train_use_case::{TrainConfig, TrainSummary, TrainUseCase};
use crate::domain::answer::Guess;

#[derive(Parser, Debug)]
#[command(
    name = "qanta-guess",
    version = "0.1.0",
    about = "Quiz bowl guessers: IR retrieval gated by a human classifier, and an RNN answer classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train { guesser } => run_train(guesser),
            Commands::Guess { guesser } => run_guess(guesser),
        }
    }
}

fn run_train(target: TrainTarget) -> Result<()> {
    let config = match target {
        TrainTarget::Ir(args)  => TrainConfig::Ir(args.into()),
        TrainTarget::Rnn(args) => TrainConfig::Rnn(args.into()),
    };
    let summary = TrainUseCase::new(config).execute()?;
    print_summary(&summary);
    Ok(())
}

fn run_guess(target: GuessTarget) -> Result<()> {
    let (use_case, args) = match target {
        GuessTarget::Ir(a)  => (GuessUseCase::load_ir(&a.guess.model_dir, a.index.into())?, a.guess),
        GuessTarget::Rnn(a) => (GuessUseCase::load_rnn(&a.model_dir)?, a),
    };
    let guesses = use_case.guess(&args.questions, args.max_guesses)?;
    print!("{}", format_guesses(&guesses));
    Ok(())
}

fn print_summary(summary: &TrainSummary) {
    println!(
        "Trained on {} questions ({} answers). Saved {} to '{}'.",
        summary.n_questions,
        summary.n_answers,
        summary.artifacts.join(", "),
        summary.output_dir.display()
    );
}

/// `rank page score` lines, questions separated by a blank line
pub fn format_guesses(guesses: &[Vec<Guess>]) -> String {
    guesses
        .iter()
        .map(|list| {
            list.iter()
                .enumerate()
                .map(|(i, g)| format!("{} {} {:.6}\n", i + 1, g.page, g.score))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_guesses() {
        let out = format_guesses(&[
            vec![Guess::new("napoleon", 0.7), Guess::new("plato", 0.3)],
            vec![Guess::new("paris", 1.25)],
        ]);
        assert_eq!(out, "1 napoleon 0.700000\n2 plato 0.300000\n\n1 paris 1.250000\n");
    }

    #[test]
    fn test_guess_requires_a_question() {
        assert!(Cli::try_parse_from(["qanta-guess", "guess", "rnn", "--model-dir", "out"]).is_err());
    }
}

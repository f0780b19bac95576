//! Interface de linha de comando do inkpot baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (generate, token)
//! e flags globais (--max-attempts, --poll-interval-ms, --verbose).

use clap::{Parser, Subcommand};

/// inkpot: geração de imagens assíncrona e tokens de acesso para publicação.
#[derive(Debug, Parser)]
#[command(name = "inkpot", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Número máximo de consultas de status por job.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Intervalo entre consultas de status, em milissegundos.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gera imagens a partir de um prompt e espera pelo resultado.
    Generate {
        /// Texto descrevendo a imagem.
        prompt: String,

        /// Texto descrevendo o que evitar na imagem.
        #[arg(long)]
        negative_prompt: Option<String>,

        /// Dimensões, ex.: "1024*1024".
        #[arg(long)]
        size: Option<String>,

        /// Quantidade de imagens.
        #[arg(long)]
        n: Option<u32>,

        #[arg(long)]
        seed: Option<u64>,

        /// Placeholder image URL printed when the job fails or times out.
        #[arg(long)]
        fallback_url: Option<String>,
    },

    /// Fetches (or reuses) the WeChat access token and prints its expiry.
    Token,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_generate_subcommand() {
        let cli = Cli::parse_from(["inkpot", "generate", "a koi pond at dusk", "--seed", "7"]);
        match cli.command {
            Command::Generate {
                prompt,
                seed,
                fallback_url,
                ..
            } => {
                assert_eq!(prompt, "a koi pond at dusk");
                assert_eq!(seed, Some(7));
                assert!(fallback_url.is_none());
            }
            _ => panic!("expected Generate command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "inkpot",
            "--max-attempts",
            "5",
            "--poll-interval-ms",
            "200",
            "--verbose",
            "token",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.max_attempts, Some(5));
        assert_eq!(cli.poll_interval_ms, Some(200));
        assert!(matches!(cli.command, Command::Token));
    }

    #[test]
    fn cli_parses_fallback_url() {
        let cli = Cli::parse_from([
            "inkpot",
            "generate",
            "x",
            "--fallback-url",
            "https://static/placeholder.png",
        ]);
        match cli.command {
            Command::Generate { fallback_url, .. } => {
                assert_eq!(fallback_url.as_deref(), Some("https://static/placeholder.png"));
            }
            _ => panic!("expected Generate command"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}

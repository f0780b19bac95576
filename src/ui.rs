//! Interface de terminal do inkpot: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente
//! a espera por um job de geração no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use inkpot::{JobReport, JobState};

/// Indicador visual de progresso para um job de geração.
pub struct JobProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    yellow: Style,
}

impl JobProgress {
    /// Inicia o spinner com o prompt e retorna a instância de progresso.
    pub fn start(prompt: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} [{elapsed}]")
                .expect("invalid template"),
        );
        pb.set_message(format!("{}: {prompt}", JobState::Submitted));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Finaliza o spinner e exibe o resultado final do job.
    pub fn complete(&self, report: &JobReport) {
        self.pb.finish_and_clear();
        match report.state {
            JobState::Succeeded => {
                println!(
                    "  {} {} image(s) after {} poll(s)",
                    self.green.apply_to("✓"),
                    report.result.len(),
                    report.attempts
                );
                for url in &report.result {
                    println!("    {url}");
                }
            }
            JobState::Cancelled => {
                println!("  {} Job {} cancelled", self.yellow.apply_to("↯"), report.job_id);
            }
            state => {
                let reason = report.failure_reason.as_deref().unwrap_or("unknown");
                println!("  {} Job {state}: {reason}", self.red.apply_to("✗"));
            }
        }
    }

    /// Para o spinner sem resultado (ex.: falha no envio).
    pub fn abandon(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }

    /// Mostra a URL substituta usada quando o job não produziu imagens.
    pub fn fallback(&self, url: &str) {
        println!("  {} Using placeholder {url}", self.yellow.apply_to("↻"));
    }

    /// Imprime o relatório do job formatado em JSON com estilo colorido.
    pub fn print_report(&self, report: &JobReport) {
        let status_style = match report.state {
            JobState::Succeeded => &self.green,
            JobState::Failed | JobState::TimedOut => &self.red,
            _ => &self.yellow,
        };
        println!();
        println!("{}", status_style.apply_to("─── Job Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(report).unwrap_or_default()
        );
    }
}

//! Interface de terminal do jobwatch: spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`WaitProgress`] acompanha visualmente
//! cada consulta de status enquanto um job remoto é aguardado.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::pipeline::{AnalyzedText, ReviewOutcome};

/// Indicador visual de progresso para a espera de um job no terminal.
///
/// Exibe um spinner animado durante o polling e mensagens
/// coloridas para sucesso (verde) e falha (vermelho).
pub struct WaitProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Nome do job aguardado, repetido em cada mensagem.
    name: String,
    // Limite de consultas, exibido como "n/max".
    max_attempts: u32,
    green: Style,
    red: Style,
}

impl WaitProgress {
    /// Inicia o spinner para o job `name` e retorna a instância de progresso.
    pub fn start(name: &str, max_attempts: u32) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg} [{elapsed}]") {
            pb.set_style(style);
        }
        pb.set_message(format!("{name}: submitted"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            name: name.to_string(),
            max_attempts,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
        }
    }

    /// Atualiza a mensagem do spinner com o status observado na consulta `attempt`.
    pub fn poll(&self, attempt: u32, status: &str) {
        self.pb.set_message(format!(
            "{}: {status} (poll {attempt}/{})",
            self.name, self.max_attempts
        ));
    }

    /// Finaliza o spinner com checkmark verde.
    pub fn success(&self, status: &str) {
        self.pb.finish_and_clear();
        println!("  {} {}: {status}", self.green.apply_to("✓"), self.name);
    }

    /// Finaliza o spinner com X vermelho e a mensagem de erro.
    pub fn failure(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }
}

/// Imprime qualquer registro serializável como JSON formatado.
pub fn print_record<T: Serialize>(title: &str, record: &T) {
    println!();
    println!("{}", Style::new().cyan().apply_to(format!("─── {title} ───")));
    println!(
        "{}",
        serde_json::to_string_pretty(record).unwrap_or_default()
    );
}

/// Tabela com o resultado do Comprehend e o loop humano (se houver) de cada texto.
pub fn print_analysis(analyzed: &[AnalyzedText]) {
    let dim = Style::new().dim();
    let yellow = Style::new().yellow();
    for item in analyzed {
        let routed = match &item.human_loop {
            Some(name) => format!("{} {name}", yellow.apply_to("→ review")),
            None => dim.apply_to("confident").to_string(),
        };
        println!(
            "  {:<8} {:>5.1}%  {}  {}",
            item.result.sentiment.to_string(),
            item.result.confidence() * 100.0,
            routed,
            dim.apply_to(&item.text)
        );
    }
}

/// Rótulos dados pelos revisores, ao lado da predição original.
pub fn print_outcome(outcome: &ReviewOutcome) {
    let green = Style::new().green();
    println!(
        "  {}  predicted {}  reviewed {}",
        outcome.loop_name,
        outcome.initial_value.as_deref().unwrap_or("?"),
        green.apply_to(outcome.labels.join(", "))
    );
    if let Some(text) = &outcome.text {
        println!("    {}", Style::new().dim().apply_to(text));
    }
}

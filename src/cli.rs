//! Interface de linha de comando do jobwatch baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (process, job-status,
//! create-flow, analyze, wait-loops, preview, demo) e flags globais
//! (--config, --interval, --max-attempts, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// jobwatch: submete jobs a serviços gerenciados de ML da AWS e aguarda o resultado.
#[derive(Debug, Parser)]
#[command(name = "jobwatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./jobwatch.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Intervalo entre consultas de status, em segundos.
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Número máximo de consultas antes de desistir.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Submete o job de pré-processamento do SageMaker Processing.
    Process {
        /// Script local a enviar para o S3 antes da submissão.
        #[arg(long)]
        code: Option<PathBuf>,

        /// Retorna logo após a submissão, sem aguardar o término.
        #[arg(long, default_value_t = false)]
        no_wait: bool,
    },

    /// Mostra o status atual de um job de processamento.
    JobStatus {
        /// Nome do job.
        name: String,
    },

    /// Cria a UI de tarefa e o flow definition de revisão humana.
    CreateFlow {
        /// Template HTML alternativo para os revisores.
        #[arg(long)]
        template: Option<PathBuf>,
    },

    /// Detecta o sentimento de cada texto; baixa confiança vai para revisão humana.
    Analyze {
        /// Textos a analisar.
        #[arg(required = true)]
        texts: Vec<String>,

        /// Confiança mínima para dispensar a revisão humana.
        #[arg(long)]
        threshold: Option<f32>,

        /// Flow definition a usar (sobrepõe `review.flow_definition_arn`).
        #[arg(long)]
        flow_arn: Option<String>,
    },

    /// Aguarda loops humanos e imprime as respostas dos revisores.
    WaitLoops {
        /// Nomes dos loops.
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Imprime as primeiras linhas de um objeto do S3.
    Preview {
        /// URI no formato s3://bucket/key.
        uri: String,

        #[arg(long, default_value_t = 5)]
        lines: usize,
    },

    /// Executa o loop de espera contra um job simulado (sem acesso à AWS).
    Demo {
        /// Número de consultas até o job simulado terminar.
        #[arg(long, default_value_t = 4)]
        polls: u32,

        /// Faz o job simulado terminar em falha.
        #[arg(long, default_value_t = false)]
        fail: bool,
    },
}

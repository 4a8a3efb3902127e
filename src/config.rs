//! Configuração do jobwatch carregada a partir de `jobwatch.toml`.
//!
//! A struct [`JobwatchConfig`] contém todos os parâmetros configuráveis,
//! agrupados por serviço: `[wait]`, `[processing]` e `[review]`.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `JOBWATCH_ROLE_ARN` e `JOBWATCH_BUCKET`
//! têm precedência sobre o arquivo.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::JobwatchError;
use crate::waiter::WaitPolicy;

/// Arquivo procurado no diretório atual quando `--config` não é informado.
pub const DEFAULT_CONFIG_FILE: &str = "jobwatch.toml";

/// Configuração de nível superior carregada de `jobwatch.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobwatchConfig {
    /// Região AWS. Vazio usa a cadeia padrão do SDK.
    pub region: Option<String>,

    /// Role IAM assumida pelos jobs e pelo flow definition.
    pub role_arn: String,

    /// Bucket S3 padrão para entradas e saídas.
    pub bucket: String,

    pub wait: WaitConfig,
    pub processing: ProcessingConfig,
    pub review: ReviewConfig,
}

/// Parâmetros do loop de polling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Intervalo entre consultas de status, em segundos.
    pub interval_secs: u64,
    /// Número máximo de consultas antes de desistir.
    pub max_attempts: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            max_attempts: 240,
        }
    }
}

impl WaitConfig {
    pub fn policy(&self) -> WaitPolicy {
        WaitPolicy::new(Duration::from_secs(self.interval_secs), self.max_attempts)
    }
}

/// Parâmetros do job de pré-processamento do SageMaker Processing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Prefixo do nome do job; um timestamp UTC é anexado.
    pub job_prefix: String,
    /// Imagem do contêiner (scikit-learn por padrão).
    pub image_uri: String,
    pub instance_type: String,
    pub instance_count: i32,
    pub volume_size_gb: i32,
    /// Dados brutos de entrada (`s3://...`).
    pub input_uri: String,
    /// Prefixo dentro do bucket para código e saídas.
    pub prefix: String,
    /// Nome do script dentro de `<prefix>/code/`.
    pub script_name: String,
    pub train_test_split_ratio: f64,
    /// Tempo máximo de execução do job, em segundos.
    pub max_runtime_secs: Option<i32>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            job_prefix: "sklearn-preprocessing".to_string(),
            image_uri: "683313688378.dkr.ecr.us-east-1.amazonaws.com/sagemaker-scikit-learn:0.20.0-cpu-py3".to_string(),
            instance_type: "ml.m5.xlarge".to_string(),
            instance_count: 1,
            volume_size_gb: 30,
            input_uri: "s3://sagemaker-sample-data-us-east-1/processing/census/census-income.csv"
                .to_string(),
            prefix: "sagemaker/sklearn-processing".to_string(),
            script_name: "preprocessing.py".to_string(),
            train_test_split_ratio: 0.2,
            max_runtime_secs: None,
        }
    }
}

/// Parâmetros da revisão humana (Comprehend + Augmented AI).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub task_ui_prefix: String,
    pub flow_prefix: String,
    /// Workteam (privado, vendor ou público) que recebe as tarefas.
    pub workteam_arn: String,
    pub task_title: String,
    pub task_description: String,
    pub task_count: i32,
    /// Prefixo dentro do bucket onde o A2I grava as respostas.
    pub output_prefix: String,
    /// Resultados com confiança abaixo deste valor vão para revisão humana.
    pub confidence_threshold: f32,
    /// Código de idioma para o Comprehend.
    pub language: String,
    /// Flow definition já existente; dispensa `create-flow`.
    pub flow_definition_arn: Option<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            task_ui_prefix: "ui-comprehend".to_string(),
            flow_prefix: "fd-comprehend".to_string(),
            workteam_arn: String::new(),
            task_title: "Review the sentiment of the text".to_string(),
            task_description: "Choose the sentiment that best describes the text".to_string(),
            task_count: 1,
            output_prefix: "a2i-comprehend-demo".to_string(),
            confidence_threshold: 0.9,
            language: "en".to_string(),
            flow_definition_arn: None,
        }
    }
}

impl Default for JobwatchConfig {
    fn default() -> Self {
        Self {
            region: None,
            role_arn: String::new(),
            bucket: String::new(),
            wait: WaitConfig::default(),
            processing: ProcessingConfig::default(),
            review: ReviewConfig::default(),
        }
    }
}

impl JobwatchConfig {
    /// Carrega a configuração de `path` (ou `jobwatch.toml` no diretório atual).
    /// Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self, JobwatchError> {
        let path = path.unwrap_or(Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<JobwatchConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo.
        if let Ok(role) = std::env::var("JOBWATCH_ROLE_ARN")
            && !role.is_empty()
        {
            config.role_arn = role;
        }
        if let Ok(bucket) = std::env::var("JOBWATCH_BUCKET")
            && !bucket.is_empty()
        {
            config.bucket = bucket;
        }

        Ok(config)
    }

    /// Rejeita valores que impediriam o polling ou o roteamento de revisão.
    pub fn validate(&self) -> Result<(), JobwatchError> {
        if self.wait.max_attempts == 0 {
            return Err(JobwatchError::Config(
                "wait.max_attempts must be at least 1".into(),
            ));
        }
        if self.wait.interval_secs == 0 {
            return Err(JobwatchError::Config(
                "wait.interval_secs must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.review.confidence_threshold) {
            return Err(JobwatchError::Config(format!(
                "review.confidence_threshold must be within [0, 1], got {}",
                self.review.confidence_threshold
            )));
        }
        Ok(())
    }

    /// Falha com uma mensagem clara quando um campo obrigatório para o comando está vazio.
    pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, JobwatchError> {
        if value.trim().is_empty() {
            Err(JobwatchError::Config(format!(
                "`{field}` is not set (jobwatch.toml or environment)"
            )))
        } else {
            Ok(value)
        }
    }
}

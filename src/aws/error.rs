//! Tipos de erro para os clientes dos serviços gerenciados da AWS.
//!
//! Define [`ServiceError`] com variantes para falhas de chamada do SDK
//! e respostas incompletas. Usa
//! `thiserror` para derivar `Display` e `Error` a partir dos atributos.

use aws_sdk_sagemaker::error::DisplayErrorContext;
use thiserror::Error;

/// Erros que podem ocorrer ao falar com SageMaker, Comprehend, A2I ou S3.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A chamada ao serviço falhou (rede, credenciais, validação remota, throttling).
    /// A mensagem carrega toda a cadeia de causas reportada pelo SDK.
    #[error("{operation} failed: {message}")]
    Sdk {
        operation: &'static str,
        message: String,
    },

    /// A resposta não trouxe um campo de que precisamos.
    #[error("{operation} response is missing {field}")]
    MissingField {
        operation: &'static str,
        field: &'static str,
    },
}

impl ServiceError {
    /// Converte um erro do SDK preservando a cadeia completa de causas.
    pub fn sdk<E: std::error::Error>(operation: &'static str) -> impl FnOnce(E) -> Self {
        move |err| ServiceError::Sdk {
            operation,
            message: DisplayErrorContext(&err).to_string(),
        }
    }
}

//! Ошибки генерации карты

use thiserror::Error;

/// Ошибки, прерывающие прогон генерации.
///
/// Частичного результата не бывает: прогон либо возвращает полностью размеченный граф,
/// либо одну из этих ошибок.
#[derive(Error, Debug)]
pub enum MapError {
    /// Недопустимые параметры (число точек, доля суши, коэффициенты)
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Диаграмма Вороного не построилась даже после возмущения точек
    #[error("geometry construction failed after {attempts} attempt(s): {reason}")]
    GeometryConstruction { attempts: usize, reason: String },

    /// Этап получил граф без результатов предыдущего этапа. Это дефект, а не ввод пользователя.
    #[error("pipeline invariant violated: {0}")]
    PipelineInvariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl MapError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        MapError::Configuration(message.into())
    }

    pub(crate) fn invariant(message: impl Into<String>) -> Self {
        MapError::PipelineInvariant(message.into())
    }
}

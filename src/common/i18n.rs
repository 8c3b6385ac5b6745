// src/common/i18n.rs

// Catálogo estático de mensagens de erro. Português é o idioma padrão da
// plataforma; inglês cobre integrações externas. Chaves = códigos estáveis
// de AppError::codigo().
#[derive(Debug, Default, Clone)]
pub struct I18nStore;

impl I18nStore {
    pub fn new() -> Self {
        Self
    }

    pub fn mensagem(&self, idioma: &str, codigo: &str) -> &'static str {
        match idioma {
            "en" => Self::em_ingles(codigo),
            _ => Self::em_portugues(codigo),
        }
    }

    fn em_portugues(codigo: &str) -> &'static str {
        match codigo {
            "validacao" => "Um ou mais campos são inválidos.",
            "nao_encontrado" => "Recurso não encontrado.",
            "acesso_negado" => "Você não tem permissão para esta operação.",
            "transicao_invalida" => "Essa mudança de status não é permitida.",
            "estado_terminal" => "O protocolo já foi encerrado.",
            "conflito_concorrencia" => {
                "O protocolo foi alterado por outra pessoa. Recarregue e tente novamente."
            }
            "quota_excedida" => "O limite de protocolos do plano foi atingido.",
            "tenant_suspenso" => "Este município está com o serviço suspenso.",
            "ja_avaliado" => "Este protocolo já foi avaliado.",
            "avaliacao_nao_elegivel" => "Só é possível avaliar protocolos concluídos.",
            "servico_invalido" => "O serviço informado não pertence a este município.",
            "token_invalido" => "Token de autenticação inválido ou ausente.",
            "indisponivel" => "Serviço temporariamente indisponível. Tente novamente.",
            _ => "Ocorreu um erro inesperado.",
        }
    }

    fn em_ingles(codigo: &str) -> &'static str {
        match codigo {
            "validacao" => "One or more fields are invalid.",
            "nao_encontrado" => "Resource not found.",
            "acesso_negado" => "You do not have permission for this operation.",
            "transicao_invalida" => "This status change is not allowed.",
            "estado_terminal" => "This protocol has already been closed.",
            "conflito_concorrencia" => {
                "The protocol was changed by someone else. Reload and try again."
            }
            "quota_excedida" => "The plan's protocol limit has been reached.",
            "tenant_suspenso" => "This municipality's service is suspended.",
            "ja_avaliado" => "This protocol has already been rated.",
            "avaliacao_nao_elegivel" => "Only concluded protocols can be rated.",
            "servico_invalido" => "The given service does not belong to this municipality.",
            "token_invalido" => "Missing or invalid authentication token.",
            "indisponivel" => "Service temporarily unavailable. Please retry.",
            _ => "An unexpected error occurred.",
        }
    }
}

// src/services/access_guard.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        ator::{Ator, Papel},
        protocolo::{Protocolo, StatusProtocolo},
    },
};

// Política de acesso avaliada ANTES de qualquer operação dos serviços sobre
// o repositório. É o único portão: nenhum componente consulta o store por
// fora dele. Substitui as row policies do banco por uma regra explícita e
// testável.
//
// Política de isolamento: acesso cruzado entre tenants responde SEMPRE
// Forbidden, nunca 404. A mesma regra vale em todos os caminhos.

/// O que o ator quer fazer com o protocolo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operacao {
    Ler,
    LerHistorico,
    Comentar { publico: bool },
    EditarCampos,
    AnexarDocumento,
    Atribuir,
    Reagendar,
    RegistrarPagamento,
    Transicionar { destino: StatusProtocolo },
    Avaliar,
}

/// Recorte mínimo do protocolo necessário para decidir a autorização.
#[derive(Debug, Clone)]
pub struct AlvoProtocolo {
    pub tenant_id: Uuid,
    pub criado_por: Uuid,
    pub status: StatusProtocolo,
    pub secretaria_origem_id: Option<Uuid>,
    pub secretaria_destino_id: Uuid,
}

impl AlvoProtocolo {
    pub fn de(protocolo: &Protocolo) -> Self {
        Self {
            tenant_id: protocolo.tenant_id,
            criado_por: protocolo.criado_por,
            status: protocolo.status,
            secretaria_origem_id: protocolo.secretaria_origem_id,
            secretaria_destino_id: protocolo.secretaria_destino_id,
        }
    }
}

/// Recorte de visibilidade da listagem, derivado do papel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscopoListagem {
    TenantInteiro,
    Secretaria(Uuid),
    Proprios(Uuid),
}

pub fn autorizar(ator: &Ator, alvo: &AlvoProtocolo, operacao: &Operacao) -> Result<(), AppError> {
    // Isolamento de tenant vem primeiro; só o super_admin cruza municípios
    // (operações de plataforma, ex.: suporte).
    if ator.tenant_id != alvo.tenant_id && ator.papel != Papel::SuperAdmin {
        return Err(AppError::Forbidden);
    }

    // Avaliação é exclusiva do requerente, não importa o papel.
    if matches!(operacao, Operacao::Avaliar) {
        return if ator.papel.eh_cidadao() && alvo.criado_por == ator.usuario_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        };
    }

    match ator.papel {
        Papel::SuperAdmin | Papel::Admin => Ok(()),

        Papel::Cidadao => {
            let proprio = alvo.criado_por == ator.usuario_id;
            match operacao {
                Operacao::Ler | Operacao::LerHistorico if proprio => Ok(()),
                // Cidadão nunca escreve nota interna
                Operacao::Comentar { publico: true } if proprio => Ok(()),
                Operacao::AnexarDocumento if proprio => Ok(()),
                // Única transição permitida ao cidadão: cancelar o próprio
                // protocolo ainda aberto.
                Operacao::Transicionar { destino: StatusProtocolo::Cancelado }
                    if proprio && alvo.status == StatusProtocolo::Aberto =>
                {
                    Ok(())
                }
                _ => Err(AppError::Forbidden),
            }
        }

        // Secretário atua em todas as secretarias do tenant.
        Papel::Secretario => operacao_de_servidor(operacao, ator.papel),

        Papel::Diretor | Papel::Coordenador | Papel::Supervisor | Papel::Operador => {
            let Some(secretaria_id) = ator.secretaria_id else {
                // Servidor sem lotação não atua sobre protocolo nenhum
                return Err(AppError::Forbidden);
            };
            let na_secretaria = alvo.secretaria_origem_id == Some(secretaria_id)
                || alvo.secretaria_destino_id == secretaria_id;
            if !na_secretaria {
                return Err(AppError::Forbidden);
            }
            operacao_de_servidor(operacao, ator.papel)
        }
    }
}

fn operacao_de_servidor(operacao: &Operacao, papel: Papel) -> Result<(), AppError> {
    match operacao {
        // Reatribuição e reagendamento exigem supervisor ou acima
        Operacao::Atribuir | Operacao::Reagendar if !papel.pode_reatribuir() => {
            Err(AppError::Forbidden)
        }
        _ => Ok(()),
    }
}

/// Criação: o ator só abre protocolo no próprio tenant (super_admin pode
/// abrir em qualquer um, para suporte).
pub fn autorizar_criacao(ator: &Ator, tenant_id: Uuid) -> Result<(), AppError> {
    if ator.tenant_id != tenant_id && ator.papel != Papel::SuperAdmin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Leituras escopadas por tenant (diretório, catálogo, dados do tenant).
pub fn autorizar_leitura_tenant(ator: &Ator, tenant_id: Uuid) -> Result<(), AppError> {
    if ator.tenant_id != tenant_id && ator.papel != Papel::SuperAdmin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Provisionamento de municípios é operação de plataforma.
pub fn autorizar_provisionamento(ator: &Ator) -> Result<(), AppError> {
    if ator.papel != Papel::SuperAdmin {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn escopo_listagem(ator: &Ator) -> Result<EscopoListagem, AppError> {
    if ator.papel.atua_em_todas_secretarias() {
        return Ok(EscopoListagem::TenantInteiro);
    }
    if ator.papel.eh_cidadao() {
        return Ok(EscopoListagem::Proprios(ator.usuario_id));
    }
    // Demais servidores listam só a própria secretaria
    ator.secretaria_id
        .map(EscopoListagem::Secretaria)
        .ok_or(AppError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ator(papel: Papel, tenant: Uuid, secretaria: Option<Uuid>) -> Ator {
        Ator {
            usuario_id: Uuid::new_v4(),
            tenant_id: tenant,
            papel,
            secretaria_id: secretaria,
        }
    }

    fn alvo(tenant: Uuid, criado_por: Uuid, secretaria_destino: Uuid) -> AlvoProtocolo {
        AlvoProtocolo {
            tenant_id: tenant,
            criado_por,
            status: StatusProtocolo::EmAndamento,
            secretaria_origem_id: None,
            secretaria_destino_id: secretaria_destino,
        }
    }

    #[test]
    fn tenant_diferente_eh_sempre_forbidden() {
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        let secretaria = Uuid::new_v4();
        let protocolo = alvo(tenant_a, Uuid::new_v4(), secretaria);

        // Nem o admin do tenant B lê o protocolo do tenant A
        for papel in [Papel::Admin, Papel::Secretario, Papel::Operador, Papel::Cidadao] {
            let intruso = ator(papel, tenant_b, Some(secretaria));
            let resultado = autorizar(&intruso, &protocolo, &Operacao::Ler);
            assert!(
                matches!(resultado, Err(AppError::Forbidden)),
                "papel {:?} deveria ser barrado",
                papel
            );
        }
    }

    #[test]
    fn super_admin_cruza_tenants() {
        let tenant_a = Uuid::new_v4();
        let protocolo = alvo(tenant_a, Uuid::new_v4(), Uuid::new_v4());
        let plataforma = ator(Papel::SuperAdmin, Uuid::new_v4(), None);
        assert!(autorizar(&plataforma, &protocolo, &Operacao::Ler).is_ok());
        assert!(autorizar(&plataforma, &protocolo, &Operacao::Atribuir).is_ok());
    }

    #[test]
    fn cidadao_so_enxerga_o_proprio_protocolo() {
        let tenant = Uuid::new_v4();
        let cidadao = ator(Papel::Cidadao, tenant, None);
        let secretaria = Uuid::new_v4();

        let meu = alvo(tenant, cidadao.usuario_id, secretaria);
        let de_outro = alvo(tenant, Uuid::new_v4(), secretaria);

        assert!(autorizar(&cidadao, &meu, &Operacao::Ler).is_ok());
        assert!(autorizar(&cidadao, &meu, &Operacao::LerHistorico).is_ok());
        assert!(matches!(
            autorizar(&cidadao, &de_outro, &Operacao::Ler),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn cidadao_nao_comenta_internamente_nem_edita() {
        let tenant = Uuid::new_v4();
        let cidadao = ator(Papel::Cidadao, tenant, None);
        let meu = alvo(tenant, cidadao.usuario_id, Uuid::new_v4());

        assert!(autorizar(&cidadao, &meu, &Operacao::Comentar { publico: true }).is_ok());
        assert!(matches!(
            autorizar(&cidadao, &meu, &Operacao::Comentar { publico: false }),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(
            autorizar(&cidadao, &meu, &Operacao::EditarCampos),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn cidadao_cancela_apenas_protocolo_proprio_e_aberto() {
        let tenant = Uuid::new_v4();
        let cidadao = ator(Papel::Cidadao, tenant, None);
        let cancelar = Operacao::Transicionar { destino: StatusProtocolo::Cancelado };

        let mut meu = alvo(tenant, cidadao.usuario_id, Uuid::new_v4());
        meu.status = StatusProtocolo::Aberto;
        assert!(autorizar(&cidadao, &meu, &cancelar).is_ok());

        // Já em andamento, não cancela mais
        meu.status = StatusProtocolo::EmAndamento;
        assert!(matches!(autorizar(&cidadao, &meu, &cancelar), Err(AppError::Forbidden)));

        // Nenhuma outra transição é permitida
        meu.status = StatusProtocolo::Aberto;
        let aprovar = Operacao::Transicionar { destino: StatusProtocolo::EmAndamento };
        assert!(matches!(autorizar(&cidadao, &meu, &aprovar), Err(AppError::Forbidden)));
    }

    #[test]
    fn operador_atua_somente_na_sua_secretaria() {
        let tenant = Uuid::new_v4();
        let secretaria_obras = Uuid::new_v4();
        let secretaria_saude = Uuid::new_v4();
        let operador = ator(Papel::Operador, tenant, Some(secretaria_obras));

        let na_minha = alvo(tenant, Uuid::new_v4(), secretaria_obras);
        let na_outra = alvo(tenant, Uuid::new_v4(), secretaria_saude);

        assert!(autorizar(&operador, &na_minha, &Operacao::EditarCampos).is_ok());
        assert!(matches!(
            autorizar(&operador, &na_outra, &Operacao::EditarCampos),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn secretaria_de_origem_tambem_conta() {
        let tenant = Uuid::new_v4();
        let secretaria_origem = Uuid::new_v4();
        let operador = ator(Papel::Operador, tenant, Some(secretaria_origem));

        let mut protocolo = alvo(tenant, Uuid::new_v4(), Uuid::new_v4());
        protocolo.secretaria_origem_id = Some(secretaria_origem);
        assert!(autorizar(&operador, &protocolo, &Operacao::Ler).is_ok());
    }

    #[test]
    fn reatribuicao_exige_supervisor_ou_acima() {
        let tenant = Uuid::new_v4();
        let secretaria = Uuid::new_v4();
        let protocolo = alvo(tenant, Uuid::new_v4(), secretaria);

        let operador = ator(Papel::Operador, tenant, Some(secretaria));
        assert!(matches!(
            autorizar(&operador, &protocolo, &Operacao::Atribuir),
            Err(AppError::Forbidden)
        ));

        let supervisor = ator(Papel::Supervisor, tenant, Some(secretaria));
        assert!(autorizar(&supervisor, &protocolo, &Operacao::Atribuir).is_ok());
        assert!(autorizar(&supervisor, &protocolo, &Operacao::Reagendar).is_ok());
    }

    #[test]
    fn secretario_atua_em_todas_as_secretarias_do_tenant() {
        let tenant = Uuid::new_v4();
        let secretario = ator(Papel::Secretario, tenant, Some(Uuid::new_v4()));
        let em_qualquer_secretaria = alvo(tenant, Uuid::new_v4(), Uuid::new_v4());

        assert!(autorizar(&secretario, &em_qualquer_secretaria, &Operacao::Atribuir).is_ok());
        let transicao = Operacao::Transicionar { destino: StatusProtocolo::Aprovado };
        assert!(autorizar(&secretario, &em_qualquer_secretaria, &transicao).is_ok());
    }

    #[test]
    fn servidor_sem_lotacao_nao_atua() {
        let tenant = Uuid::new_v4();
        let deslotado = ator(Papel::Operador, tenant, None);
        let protocolo = alvo(tenant, Uuid::new_v4(), Uuid::new_v4());
        assert!(matches!(
            autorizar(&deslotado, &protocolo, &Operacao::Ler),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn avaliacao_eh_exclusiva_do_requerente() {
        let tenant = Uuid::new_v4();
        let cidadao = ator(Papel::Cidadao, tenant, None);
        let meu = alvo(tenant, cidadao.usuario_id, Uuid::new_v4());
        assert!(autorizar(&cidadao, &meu, &Operacao::Avaliar).is_ok());

        // Nem o admin avalia protocolo dos outros
        let admin = ator(Papel::Admin, tenant, None);
        assert!(matches!(
            autorizar(&admin, &meu, &Operacao::Avaliar),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn escopos_de_listagem_por_papel() {
        let tenant = Uuid::new_v4();
        let secretaria = Uuid::new_v4();

        let cidadao = ator(Papel::Cidadao, tenant, None);
        assert_eq!(
            escopo_listagem(&cidadao).unwrap(),
            EscopoListagem::Proprios(cidadao.usuario_id)
        );

        let operador = ator(Papel::Operador, tenant, Some(secretaria));
        assert_eq!(
            escopo_listagem(&operador).unwrap(),
            EscopoListagem::Secretaria(secretaria)
        );

        let deslotado = ator(Papel::Diretor, tenant, None);
        assert!(matches!(escopo_listagem(&deslotado), Err(AppError::Forbidden)));

        let admin = ator(Papel::Admin, tenant, None);
        assert_eq!(escopo_listagem(&admin).unwrap(), EscopoListagem::TenantInteiro);
    }

    #[test]
    fn provisionamento_so_para_super_admin() {
        assert!(autorizar_provisionamento(&ator(Papel::SuperAdmin, Uuid::new_v4(), None)).is_ok());
        assert!(matches!(
            autorizar_provisionamento(&ator(Papel::Admin, Uuid::new_v4(), None)),
            Err(AppError::Forbidden)
        ));
    }
}

// tests/integracao_protocolos.rs
//
// Propriedades que dependem do banco de verdade: unicidade da numeração sob
// concorrência, atomicidade status+histórico, avaliação única sob corrida.
// Rodar com um Postgres disponível:
//   DATABASE_URL=postgres://... cargo test -- --ignored

use chrono::Duration;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use uuid::Uuid;

use protocolo_backend::{
    common::error::AppError,
    db::{
        CatalogoRepository, DiretorioRepository, HistoricoRepository, ProtocoloRepository,
        SequenciaRepository, TenantRepository,
    },
    models::{
        ator::{Ator, MetadadosRequisicao, Papel},
        protocolo::{Requerente, StatusProtocolo},
    },
    services::{
        event_bus::EventBus, protocolo_service::DadosCriacao, AvaliacaoService, ProtocoloService,
    },
};

struct Infra {
    pool: PgPool,
    protocolos: ProtocoloService,
    avaliacoes: AvaliacaoService,
}

async fn infra() -> Infra {
    dotenvy::dotenv().ok();
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL deve apontar para um Postgres de teste");
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&url)
        .await
        .expect("falha ao conectar no Postgres de teste");

    sqlx::migrate!().run(&pool).await.expect("falha nas migrações");

    let protocolo_repo = ProtocoloRepository::new(pool.clone());
    let historico_repo = HistoricoRepository::new(pool.clone());
    let tenant_repo = TenantRepository::new(pool.clone());
    let catalogo_repo = CatalogoRepository::new(pool.clone());
    let sequencia_repo = SequenciaRepository::new(pool.clone());
    let diretorio_repo = DiretorioRepository::new(pool.clone());
    let event_bus = EventBus::new(64);

    let protocolos = ProtocoloService::new(
        protocolo_repo.clone(),
        historico_repo.clone(),
        tenant_repo,
        catalogo_repo,
        sequencia_repo,
        diretorio_repo,
        event_bus.clone(),
        pool.clone(),
    );
    let avaliacoes = AvaliacaoService::new(protocolo_repo, historico_repo, event_bus, pool.clone());

    Infra { pool, protocolos, avaliacoes }
}

struct Cenario {
    tenant_id: Uuid,
    servico_id: Uuid,
    codigo: String,
}

/// Semeia um município isolado (slug único) com uma secretaria e um serviço
/// de prazo 15 dias.
async fn semear_municipio(pool: &PgPool) -> Cenario {
    let sufixo = Uuid::new_v4().simple().to_string();
    let slug = format!("teste-{}", &sufixo[..12]);
    let codigo = format!("T{}", &sufixo[..8].to_uppercase());

    let tenant_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO tenants (slug, codigo, nome, plano, status, max_protocolos)
        VALUES ($1, $2, 'Prefeitura de Teste', 'professional', 'ativo', 1000)
        RETURNING id
        "#,
    )
    .bind(&slug)
    .bind(&codigo)
    .fetch_one(pool)
    .await
    .unwrap();

    let secretaria_id: Uuid = sqlx::query_scalar(
        "INSERT INTO secretarias (tenant_id, nome) VALUES ($1, 'Secretaria de Obras') RETURNING id",
    )
    .bind(tenant_id)
    .fetch_one(pool)
    .await
    .unwrap();

    let servico_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO servicos_catalogo (tenant_id, secretaria_id, nome, categoria, taxa, prazo_dias)
        VALUES ($1, $2, 'Tapa-buraco', 'Infraestrutura', 35.00, 15)
        RETURNING id
        "#,
    )
    .bind(tenant_id)
    .bind(secretaria_id)
    .fetch_one(pool)
    .await
    .unwrap();

    Cenario { tenant_id, servico_id, codigo }
}

fn cidadao(tenant_id: Uuid) -> Ator {
    Ator {
        usuario_id: Uuid::new_v4(),
        tenant_id,
        papel: Papel::Cidadao,
        secretaria_id: None,
    }
}

fn admin(tenant_id: Uuid) -> Ator {
    Ator {
        usuario_id: Uuid::new_v4(),
        tenant_id,
        papel: Papel::Admin,
        secretaria_id: None,
    }
}

fn dados_criacao(servico_id: Uuid) -> DadosCriacao {
    DadosCriacao {
        servico_id,
        titulo: "Buraco na Rua das Flores".to_string(),
        descricao: "Cratera na altura do número 120.".to_string(),
        requerente: Requerente {
            nome: "Maria da Silva".to_string(),
            documento: "123.456.789-00".to_string(),
            email: Some("maria@example.com".to_string()),
            telefone: None,
        },
        prioridade: None,
        urgente: false,
        subcategoria: None,
        formulario: None,
    }
}

async fn contar_historico(pool: &PgPool, protocolo_id: Uuid) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM protocolo_historico WHERE protocolo_id = $1")
        .bind(protocolo_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn primeiro_protocolo_do_ano_recebe_sequencia_0001() {
    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let ator = cidadao(cenario.tenant_id);
    let metadados = MetadadosRequisicao::default();

    let protocolo = infra
        .protocolos
        .criar(&ator, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap();

    let ano = protocolo.aberto_em.format("%Y").to_string();
    assert_eq!(
        protocolo.numero_protocolo,
        format!("{}-{}-0001", cenario.codigo, ano)
    );
    assert_eq!(protocolo.status, StatusProtocolo::Aberto);
    assert_eq!(protocolo.data_limite, protocolo.aberto_em + Duration::days(15));

    // A abertura gera exatamente uma entrada de histórico
    assert_eq!(contar_historico(&infra.pool, protocolo.id).await, 1);
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn numeracao_nunca_duplica_sob_criacao_concorrente() {
    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let metadados = MetadadosRequisicao::default();

    let mut tarefas = Vec::new();
    for _ in 0..20 {
        let servico = infra.protocolos.clone();
        let ator = cidadao(cenario.tenant_id);
        let tenant_id = cenario.tenant_id;
        let servico_id = cenario.servico_id;
        let metadados = metadados.clone();
        tarefas.push(tokio::spawn(async move {
            servico
                .criar(&ator, tenant_id, &metadados, dados_criacao(servico_id))
                .await
        }));
    }

    let mut numeros = Vec::new();
    for tarefa in tarefas {
        let protocolo = tarefa.await.unwrap().unwrap();
        numeros.push(protocolo.numero_protocolo);
    }

    let total = numeros.len();
    numeros.sort();
    numeros.dedup();
    assert_eq!(numeros.len(), total, "números duplicados sob concorrência");
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn aprovacao_e_conclusao_apensam_duas_entradas() {
    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let requerente = cidadao(cenario.tenant_id);
    let gestor = admin(cenario.tenant_id);
    let metadados = MetadadosRequisicao::default();

    let protocolo = infra
        .protocolos
        .criar(&requerente, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap();

    // Leva até aguardando_aprovacao
    for destino in [StatusProtocolo::EmAndamento, StatusProtocolo::AguardandoAprovacao] {
        infra
            .protocolos
            .transicionar(&gestor, protocolo.id, destino, None, &metadados)
            .await
            .unwrap();
    }

    let antes = contar_historico(&infra.pool, protocolo.id).await;

    infra
        .protocolos
        .transicionar(&gestor, protocolo.id, StatusProtocolo::Aprovado, None, &metadados)
        .await
        .unwrap();
    let concluido = infra
        .protocolos
        .transicionar(&gestor, protocolo.id, StatusProtocolo::Concluido, None, &metadados)
        .await
        .unwrap();

    assert_eq!(concluido.status, StatusProtocolo::Concluido);
    assert!(concluido.concluido_em.is_some());
    assert_eq!(contar_historico(&infra.pool, protocolo.id).await, antes + 2);
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn transicao_ilegal_nao_escreve_nada() {
    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let requerente = cidadao(cenario.tenant_id);
    let gestor = admin(cenario.tenant_id);
    let metadados = MetadadosRequisicao::default();

    let protocolo = infra
        .protocolos
        .criar(&requerente, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap();
    let antes = contar_historico(&infra.pool, protocolo.id).await;

    // aberto -> concluido não está na tabela
    let erro = infra
        .protocolos
        .transicionar(&gestor, protocolo.id, StatusProtocolo::Concluido, None, &metadados)
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::IllegalTransition { .. }));

    // Status intacto, nenhuma entrada a mais
    let relido = infra.protocolos.obter(&gestor, protocolo.id).await.unwrap();
    assert_eq!(relido.status, StatusProtocolo::Aberto);
    assert_eq!(contar_historico(&infra.pool, protocolo.id).await, antes);
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn avaliacao_acontece_no_maximo_uma_vez() {
    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let requerente = cidadao(cenario.tenant_id);
    let gestor = admin(cenario.tenant_id);
    let metadados = MetadadosRequisicao::default();

    let protocolo = infra
        .protocolos
        .criar(&requerente, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap();

    for destino in [
        StatusProtocolo::EmAndamento,
        StatusProtocolo::Aprovado,
        StatusProtocolo::Concluido,
    ] {
        infra
            .protocolos
            .transicionar(&gestor, protocolo.id, destino, None, &metadados)
            .await
            .unwrap();
    }

    let avaliado = infra
        .avaliacoes
        .avaliar(&requerente, protocolo.id, 5, Some("Resolvido rápido".to_string()), &metadados)
        .await
        .unwrap();
    assert_eq!(avaliado.avaliacao_nota, Some(5));
    assert!(avaliado.avaliado_em.is_some());

    let segunda = infra
        .avaliacoes
        .avaliar(&requerente, protocolo.id, 4, None, &metadados)
        .await
        .unwrap_err();
    assert!(matches!(segunda, AppError::AlreadyEvaluated));
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn avaliacoes_concorrentes_so_uma_vence() {
    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let requerente = cidadao(cenario.tenant_id);
    let gestor = admin(cenario.tenant_id);
    let metadados = MetadadosRequisicao::default();

    let protocolo = infra
        .protocolos
        .criar(&requerente, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap();
    for destino in [
        StatusProtocolo::EmAndamento,
        StatusProtocolo::Aprovado,
        StatusProtocolo::Concluido,
    ] {
        infra
            .protocolos
            .transicionar(&gestor, protocolo.id, destino, None, &metadados)
            .await
            .unwrap();
    }

    let mut tarefas = Vec::new();
    for nota in [4i16, 5i16] {
        let avaliacoes = infra.avaliacoes.clone();
        let ator = requerente.clone();
        let id = protocolo.id;
        let metadados = metadados.clone();
        tarefas.push(tokio::spawn(async move {
            avaliacoes.avaliar(&ator, id, nota, None, &metadados).await
        }));
    }

    let mut sucessos = 0;
    let mut ja_avaliado = 0;
    for tarefa in tarefas {
        match tarefa.await.unwrap() {
            Ok(_) => sucessos += 1,
            Err(AppError::AlreadyEvaluated) => ja_avaliado += 1,
            Err(outro) => panic!("erro inesperado: {:?}", outro),
        }
    }
    assert_eq!(sucessos, 1);
    assert_eq!(ja_avaliado, 1);
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn municipio_vizinho_nao_enxerga_o_protocolo() {
    let infra = infra().await;
    let cenario_a = semear_municipio(&infra.pool).await;
    let cenario_b = semear_municipio(&infra.pool).await;
    let metadados = MetadadosRequisicao::default();

    let requerente = cidadao(cenario_a.tenant_id);
    let protocolo = infra
        .protocolos
        .criar(&requerente, cenario_a.tenant_id, &metadados, dados_criacao(cenario_a.servico_id))
        .await
        .unwrap();

    // Até o admin do município B é barrado, e com Forbidden, não 404
    let intruso = admin(cenario_b.tenant_id);
    let erro = infra.protocolos.obter(&intruso, protocolo.id).await.unwrap_err();
    assert!(matches!(erro, AppError::Forbidden));

    let erro = infra
        .protocolos
        .transicionar(&intruso, protocolo.id, StatusProtocolo::EmAndamento, None, &metadados)
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::Forbidden));
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn tenant_suspenso_rejeita_protocolo_novo() {
    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let metadados = MetadadosRequisicao::default();

    sqlx::query("UPDATE tenants SET status = 'suspenso' WHERE id = $1")
        .bind(cenario.tenant_id)
        .execute(&infra.pool)
        .await
        .unwrap();

    let requerente = cidadao(cenario.tenant_id);
    let erro = infra
        .protocolos
        .criar(&requerente, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::TenantSuspended));
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn quota_cheia_rejeita_criacao() {
    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let metadados = MetadadosRequisicao::default();

    sqlx::query("UPDATE tenants SET max_protocolos = 1 WHERE id = $1")
        .bind(cenario.tenant_id)
        .execute(&infra.pool)
        .await
        .unwrap();

    let requerente = cidadao(cenario.tenant_id);
    infra
        .protocolos
        .criar(&requerente, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap();

    let erro = infra
        .protocolos
        .criar(&requerente, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap_err();
    assert!(matches!(erro, AppError::QuotaExceeded));
}

#[tokio::test]
#[ignore = "requer Postgres em DATABASE_URL"]
async fn edicao_gera_uma_entrada_por_campo() {
    use protocolo_backend::db::protocolo_repo::EdicaoCampos;
    use protocolo_backend::models::protocolo::Prioridade;

    let infra = infra().await;
    let cenario = semear_municipio(&infra.pool).await;
    let requerente = cidadao(cenario.tenant_id);
    let gestor = admin(cenario.tenant_id);
    let metadados = MetadadosRequisicao::default();

    let protocolo = infra
        .protocolos
        .criar(&requerente, cenario.tenant_id, &metadados, dados_criacao(cenario.servico_id))
        .await
        .unwrap();
    let antes = contar_historico(&infra.pool, protocolo.id).await;

    let edicao = EdicaoCampos {
        titulo: Some("Cratera na Rua das Flores".to_string()),
        prioridade: Some(Prioridade::Alta),
        urgente: Some(true),
        ..Default::default()
    };
    infra
        .protocolos
        .editar(&gestor, protocolo.id, edicao, &metadados)
        .await
        .unwrap();

    // Três campos mudaram => três entradas, nunca uma só agrupada
    assert_eq!(contar_historico(&infra.pool, protocolo.id).await, antes + 3);
}

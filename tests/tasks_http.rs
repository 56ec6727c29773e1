//! End-to-end tests for the task endpoints: bearer authentication and the
//! scoped role policy as seen over HTTP.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use serde_json::{json, Value};

use taskplane::api::build_router;
use taskplane::auth::models::{Role, User};
use taskplane::auth::TokenIssuer;
use taskplane::config::{AppConfig, DatabaseConfig};
use taskplane::domain::{OrganizationId, ProjectId, TaskId, TeamId, UserId};
use taskplane::storage::{create_pool, DbPool};

struct Fixture {
    org_id: OrganizationId,
    other_org_id: OrganizationId,
    task_id: TaskId,
    member_id: UserId,
    teammate_id: UserId,
    leader_id: UserId,
}

async fn setup() -> (TestServer, TokenIssuer, Fixture) {
    let db_config = DatabaseConfig {
        url: "sqlite://:memory:".to_string(),
        max_connections: 1,
        auto_migrate: true,
        ..Default::default()
    };
    let pool = create_pool(&db_config).await.unwrap();
    let fixture = seed(&pool).await;

    let mut config = AppConfig::default();
    config.auth.jwt_secret = "0123456789abcdef0123456789abcdef".to_string();
    config.auth.refresh_token_pepper = "fedcba9876543210fedcba9876543210".to_string();
    let issuer = TokenIssuer::new(&config.auth);

    let server = TestServer::new(build_router(pool, &config)).unwrap();
    (server, issuer, fixture)
}

async fn seed(pool: &DbPool) -> Fixture {
    let org_id = OrganizationId::new();
    let other_org_id = OrganizationId::new();
    let team_id = TeamId::new();
    let project_id = ProjectId::new();
    let task_id = TaskId::new();
    let member_id = UserId::new();
    let teammate_id = UserId::new();
    let leader_id = UserId::new();

    for (id, name) in [(&org_id, "Org A"), (&other_org_id, "Org B")] {
        sqlx::query("INSERT INTO organizations (id, name) VALUES (?, ?)")
            .bind(id)
            .bind(name)
            .execute(pool)
            .await
            .unwrap();
    }

    for (id, role) in
        [(&member_id, "member"), (&teammate_id, "member"), (&leader_id, "team_leader")]
    {
        sqlx::query(
            "INSERT INTO users (id, name, email, role, organization_id, password_hash)
             VALUES (?, ?, ?, ?, ?, 'unused')",
        )
        .bind(id)
        .bind("Seeded User")
        .bind(format!("{}@example.com", id))
        .bind(role)
        .bind(&org_id)
        .execute(pool)
        .await
        .unwrap();
    }

    sqlx::query("INSERT INTO teams (id, name, organization_id) VALUES (?, 'Team', ?)")
        .bind(&team_id)
        .bind(&org_id)
        .execute(pool)
        .await
        .unwrap();

    for user_id in [&member_id, &teammate_id, &leader_id] {
        sqlx::query("INSERT INTO team_members (id, team_id, user_id) VALUES (?, ?, ?)")
            .bind(uuid::Uuid::new_v4().to_string())
            .bind(&team_id)
            .bind(user_id)
            .execute(pool)
            .await
            .unwrap();
    }

    sqlx::query("INSERT INTO projects (id, name, team_id) VALUES (?, 'Project', ?)")
        .bind(&project_id)
        .bind(&team_id)
        .execute(pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO tasks (id, title, status, project_id, assignee_id)
         VALUES (?, 'Ship it', 'todo', ?, ?)",
    )
    .bind(&task_id)
    .bind(&project_id)
    .bind(&member_id)
    .execute(pool)
    .await
    .unwrap();

    Fixture { org_id, other_org_id, task_id, member_id, teammate_id, leader_id }
}

fn bearer_for(
    issuer: &TokenIssuer,
    user_id: &UserId,
    role: Role,
    org: Option<&OrganizationId>,
) -> String {
    let now = Utc::now();
    let user = User {
        id: user_id.clone(),
        name: "Seeded User".to_string(),
        email: format!("{}@example.com", user_id),
        role,
        organization_id: org.cloned(),
        created_at: now,
        updated_at: now,
    };
    issuer.create_token(&user).unwrap()
}

#[tokio::test]
async fn task_routes_require_a_bearer_token() {
    let (server, _issuer, fixture) = setup().await;
    let path = format!("/api/v1/tasks/{}", fixture.task_id);

    let response = server.get(&path).await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let response = server.get(&path).authorization_bearer("not-a-jwt").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "unauthorized");
}

#[tokio::test]
async fn assignee_reads_and_moves_their_own_task() {
    let (server, issuer, fixture) = setup().await;
    let token = bearer_for(&issuer, &fixture.member_id, Role::Member, Some(&fixture.org_id));
    let path = format!("/api/v1/tasks/{}", fixture.task_id);

    let response = server.get(&path).authorization_bearer(&token).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Ship it");
    assert_eq!(body["status"], "todo");

    let response = server
        .put(&format!("{}/status", path))
        .authorization_bearer(&token)
        .json(&json!({ "status": "in_progress" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "in_progress");
}

#[tokio::test]
async fn teammate_member_reads_but_cannot_write() {
    let (server, issuer, fixture) = setup().await;
    let token = bearer_for(&issuer, &fixture.teammate_id, Role::Member, Some(&fixture.org_id));
    let path = format!("/api/v1/tasks/{}", fixture.task_id);

    let response = server.get(&path).authorization_bearer(&token).await;
    response.assert_status_ok();

    let response = server
        .put(&format!("{}/assignee", path))
        .authorization_bearer(&token)
        .json(&json!({ "assigneeId": fixture.teammate_id }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(response.json::<Value>()["error"], "forbidden");
}

#[tokio::test]
async fn team_leader_reassigns_within_their_team() {
    let (server, issuer, fixture) = setup().await;
    let token = bearer_for(&issuer, &fixture.leader_id, Role::TeamLeader, Some(&fixture.org_id));

    let response = server
        .put(&format!("/api/v1/tasks/{}/assignee", fixture.task_id))
        .authorization_bearer(&token)
        .json(&json!({ "assigneeId": fixture.teammate_id }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["assigneeId"], fixture.teammate_id.as_str());
}

#[tokio::test]
async fn manager_is_bounded_by_organization() {
    let (server, issuer, fixture) = setup().await;
    let manager_id = UserId::new();
    let path = format!("/api/v1/tasks/{}", fixture.task_id);

    let same_org = bearer_for(&issuer, &manager_id, Role::Manager, Some(&fixture.org_id));
    let response = server.get(&path).authorization_bearer(&same_org).await;
    response.assert_status_ok();

    let foreign = bearer_for(&issuer, &manager_id, Role::Manager, Some(&fixture.other_org_id));
    let response = server.get(&path).authorization_bearer(&foreign).await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_sees_everything_and_missing_tasks_are_404() {
    let (server, issuer, fixture) = setup().await;
    let token = bearer_for(&issuer, &UserId::new(), Role::Admin, None);

    let response = server
        .get(&format!("/api/v1/tasks/{}", fixture.task_id))
        .authorization_bearer(&token)
        .await;
    response.assert_status_ok();

    let response = server
        .get(&format!("/api/v1/tasks/{}", TaskId::new()))
        .authorization_bearer(&token)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "not_found");
}

#[tokio::test]
async fn clearing_the_assignee_is_allowed_for_leaders() {
    let (server, issuer, fixture) = setup().await;
    let token = bearer_for(&issuer, &fixture.leader_id, Role::TeamLeader, Some(&fixture.org_id));

    let response = server
        .put(&format!("/api/v1/tasks/{}/assignee", fixture.task_id))
        .authorization_bearer(&token)
        .json(&json!({ "assigneeId": null }))
        .await;
    response.assert_status_ok();
    assert!(response.json::<Value>()["assigneeId"].is_null());
}

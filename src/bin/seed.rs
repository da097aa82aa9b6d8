use chrono::{Duration, Utc};
use hypex_storefront_api::{
    config::AppConfig,
    db::create_pool,
    services::auth_service::hash_password,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let admin_id = ensure_user(&pool, "Admin HYPEX", "admin@hypex.com.br", "admin123", "admin").await?;
    let user_id = ensure_user(&pool, "Cliente Teste", "cliente@hypex.com.br", "cliente123", "user").await?;
    seed_products(&pool).await?;
    seed_coupons(&pool).await?;

    println!("Seed completed. Admin ID: {admin_id}, User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let (user_id,): (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    // Prices in centavos.
    let products = [
        ("Camiseta HYPEX Preta", "Algodão 100%, modelagem oversized", 12990_i64, 40),
        ("Moletom HYPEX Logo", "Moletom flanelado com capuz", 27990, 25),
        ("Boné HYPEX Classic", "Aba curva, ajuste traseiro", 8990, 60),
        ("Tênis HYPEX Runner", "Solado em EVA, cabedal em mesh", 39990, 12),
        ("Meia HYPEX Pack", "Kit com 3 pares", 4990, 3),
    ];

    for (name, description, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, stock)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}

async fn seed_coupons(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let expires_at = Utc::now() + Duration::days(90);
    // (code, kind, value, usage_limit): percentage values are whole percent,
    // fixed values are centavos.
    let coupons = [
        ("HYPE10", "percentage", 10_i64, None::<i32>),
        ("FRETE20", "fixed", 2000, Some(100)),
    ];

    for (code, kind, value, usage_limit) in coupons {
        sqlx::query(
            r#"
            INSERT INTO coupons (id, code, kind, value, active, expires_at, usage_limit)
            VALUES ($1, $2, $3, $4, TRUE, $5, $6)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(code)
        .bind(kind)
        .bind(value)
        .bind(expires_at)
        .bind(usage_limit)
        .execute(pool)
        .await?;
    }

    println!("Seeded coupons");
    Ok(())
}

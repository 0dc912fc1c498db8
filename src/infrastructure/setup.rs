//! Offline database setup: schema creation and demo data generation.
//!
//! Used by the `create_schema` and `generate_demo_data` binaries, which run
//! once before the chat server starts. The runtime never writes to these
//! tables.

use crate::config::DatabaseSettings;
use chrono::{Duration, NaiveDate, Utc};
use log::info;
use rand::Rng;
use rand::seq::SliceRandom;
use sqlx::AnyPool;

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    user_id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT UNIQUE,
    registration_date TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_dormant INTEGER NOT NULL DEFAULT 0,
    is_cancelled INTEGER NOT NULL DEFAULT 0,
    last_activity_date TEXT
)";

const CREATE_CATEGORIES: &str = "CREATE TABLE IF NOT EXISTS categories (
    category_id INTEGER PRIMARY KEY,
    category_name TEXT NOT NULL UNIQUE
)";

const CREATE_PURCHASES: &str = "CREATE TABLE IF NOT EXISTS purchases (
    purchase_id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    amount REAL NOT NULL,
    purchase_date TEXT NOT NULL,
    category_id INTEGER NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users (user_id),
    FOREIGN KEY (category_id) REFERENCES categories (category_id)
)";

/// Seeded purchase categories. Names are stored in Japanese and the
/// generation prompt tells the model to use them verbatim.
pub const CATEGORIES: &[(i64, &str)] = &[
    (1, "食品"),
    (2, "衣料品"),
    (3, "美容"),
    (4, "旅行"),
    (5, "エンターテイメント"),
    (6, "交通"),
    (7, "住居"),
    (8, "医療"),
    (9, "教育"),
    (10, "ペット"),
    (11, "その他"),
];

const FIRST_NAMES: &[&str] = &[
    "太郎", "次郎", "花子", "裕子", "健太", "直樹", "美咲", "真理", "和也", "拓也", "恵子",
    "幸子", "大輔", "翔太", "愛", "優子", "健", "陽子", "誠", "裕美",
];

const LAST_NAMES: &[&str] = &[
    "佐藤", "鈴木", "高橋", "田中", "伊藤", "渡辺", "山本", "中村", "小林", "加藤", "吉田",
    "山田", "佐々木", "山口", "松本", "井上", "木村", "林", "斎藤", "清水",
];

const EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.co.jp",
    "outlook.jp",
    "docomo.ne.jp",
    "ezweb.ne.jp",
    "softbank.ne.jp",
    "icloud.com",
    "hotmail.com",
    "example.com",
    "mail.com",
];

/// Creates the three tables and seeds the categories. Idempotent: existing
/// tables and rows are left untouched.
pub async fn create_schema(pool: &AnyPool, database: &DatabaseSettings) -> Result<(), sqlx::Error> {
    sqlx::query(CREATE_USERS).execute(pool).await?;
    sqlx::query(CREATE_CATEGORIES).execute(pool).await?;
    sqlx::query(CREATE_PURCHASES).execute(pool).await?;

    let seed = match database {
        DatabaseSettings::Sqlite { .. } => {
            "INSERT OR IGNORE INTO categories (category_id, category_name) VALUES (?, ?)"
        }
        DatabaseSettings::Postgres { .. } => {
            "INSERT INTO categories (category_id, category_name) VALUES (?, ?) ON CONFLICT DO NOTHING"
        }
        DatabaseSettings::Mysql { .. } => {
            "INSERT IGNORE INTO categories (category_id, category_name) VALUES (?, ?)"
        }
    };

    for (category_id, category_name) in CATEGORIES {
        sqlx::query(seed)
            .bind(category_id)
            .bind(category_name)
            .execute(pool)
            .await?;
    }

    Ok(())
}

struct DemoUser {
    user_id: i64,
    name: String,
    email: String,
    registration_date: NaiveDate,
    is_active: i64,
    is_dormant: i64,
    is_cancelled: i64,
    last_activity_date: NaiveDate,
}

/// Replaces users and purchases with a fresh synthetic population:
/// roughly 5% cancelled and 15% dormant users, with one year of purchase
/// history for everyone else.
pub async fn generate_demo_data(pool: &AnyPool, num_users: i64) -> Result<(), sqlx::Error> {
    let mut rng = rand::thread_rng();

    let end_date = Utc::now().date_naive();
    let start_date = end_date - Duration::days(365);

    info!("Clearing existing data...");
    sqlx::query("DELETE FROM purchases").execute(pool).await?;
    sqlx::query("DELETE FROM users").execute(pool).await?;

    info!("Generating {num_users} users...");
    let mut users = Vec::with_capacity(num_users as usize);
    for user_id in 1..=num_users {
        let first = FIRST_NAMES.choose(&mut rng).unwrap();
        let last = LAST_NAMES.choose(&mut rng).unwrap();
        let domain = EMAIL_DOMAINS.choose(&mut rng).unwrap();

        // Registration within the past 3 years.
        let registration_date =
            random_date(&mut rng, start_date - Duration::days(730), end_date);

        let (is_active, is_dormant, is_cancelled, last_activity_date) = if rng.gen_bool(0.05) {
            (0, 0, 1, random_date(&mut rng, registration_date, end_date))
        } else if rng.gen_bool(0.15) {
            let dormant_end = end_date - Duration::days(90);
            (
                1,
                1,
                0,
                random_date(&mut rng, registration_date.min(dormant_end), dormant_end),
            )
        } else {
            let recent = (end_date - Duration::days(30)).max(registration_date);
            (1, 0, 0, random_date(&mut rng, recent, end_date))
        };

        users.push(DemoUser {
            user_id,
            name: format!("{last} {first}"),
            email: format!("user{user_id}@{domain}"),
            registration_date,
            is_active,
            is_dormant,
            is_cancelled,
            last_activity_date,
        });
    }

    for user in &users {
        sqlx::query(
            "INSERT INTO users (user_id, name, email, registration_date, is_active, is_dormant, is_cancelled, last_activity_date) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.registration_date.format("%Y-%m-%d").to_string())
        .bind(user.is_active)
        .bind(user.is_dormant)
        .bind(user.is_cancelled)
        .bind(user.last_activity_date.format("%Y-%m-%d").to_string())
        .execute(pool)
        .await?;
    }

    info!("Generating purchases...");
    let category_ids: Vec<i64> = CATEGORIES.iter().map(|(id, _)| *id).collect();
    let mut purchase_id: i64 = 1;

    for user in &users {
        // Cancelled users keep no purchase history in the demo set.
        if user.is_cancelled == 1 {
            continue;
        }

        let (num_purchases, purchase_end) = if user.is_dormant == 1 {
            (rng.gen_range(1..=20), user.last_activity_date)
        } else {
            (rng.gen_range(20..=100), end_date)
        };

        // A few preferred categories dominate each user's purchases.
        let mut shuffled = category_ids.clone();
        shuffled.shuffle(&mut rng);
        let preferred: Vec<i64> = shuffled.into_iter().take(3).collect();

        for _ in 0..num_purchases {
            let purchase_date = random_date(
                &mut rng,
                user.registration_date.max(start_date).min(purchase_end),
                purchase_end,
            );
            let category_id = if rng.gen_bool(0.7) {
                *preferred.choose(&mut rng).unwrap()
            } else {
                *category_ids.choose(&mut rng).unwrap()
            };

            sqlx::query(
                "INSERT INTO purchases (purchase_id, user_id, amount, purchase_date, category_id) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(purchase_id)
            .bind(user.user_id)
            .bind(random_amount(&mut rng))
            .bind(purchase_date.format("%Y-%m-%d").to_string())
            .bind(category_id)
            .execute(pool)
            .await?;

            purchase_id += 1;
        }
    }

    info!("Generated {num_users} users and {} purchases.", purchase_id - 1);
    Ok(())
}

fn random_date(rng: &mut impl Rng, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    let days = (end - start).num_days();
    if days <= 0 {
        return start;
    }
    start + Duration::days(rng.gen_range(0..days))
}

/// Amounts between 100 and 50,000 yen in steps of 100, with a 10% chance
/// of a larger purchase.
fn random_amount(rng: &mut impl Rng) -> f64 {
    let mut base: i64 = rng.gen_range(1..=500);
    if rng.gen_bool(0.1) {
        base *= rng.gen_range(5..=10);
    }
    (base * 100).min(50_000) as f64
}

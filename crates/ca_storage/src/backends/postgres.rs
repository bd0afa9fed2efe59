use async_trait::async_trait;
use ca_core::{Article, ArticleSection, ArticleStore, Result, SectionKind, SourceName, Upserted};
use sqlx::postgres::PgPool;
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS articles (
        id UUID PRIMARY KEY,
        title TEXT NOT NULL,
        url TEXT UNIQUE NOT NULL,
        image_url TEXT,
        published_date_raw TEXT,
        published_date DATE,
        source_name TEXT NOT NULL,
        intro TEXT,
        importance_rating TEXT,
        scraped_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sections (
        id UUID PRIMARY KEY,
        article_id UUID NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
        heading TEXT,
        body_text TEXT,
        kind TEXT CHECK (kind IN ('paragraph', 'list')),
        sequence_order INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS section_bullets (
        id UUID PRIMARY KEY,
        section_id UUID NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        bullet_order INTEGER NOT NULL
    )
    "#,
    // Add future migrations here
];

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| ca_core::Error::Storage(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| ca_core::Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        info!("database schema ready");
        Ok(Self { pool })
    }

    async fn load_sections(&self, article_id: Uuid) -> Result<Vec<ArticleSection>> {
        let rows = sqlx::query(
            "SELECT id, heading, body_text, kind FROM sections WHERE article_id = $1 ORDER BY sequence_order",
        )
        .bind(article_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ca_core::Error::Storage(format!("Failed to load sections: {}", e)))?;

        let mut sections = Vec::with_capacity(rows.len());
        for row in rows {
            let section_id: Uuid = row.get("id");
            let bullet_rows = sqlx::query(
                "SELECT content FROM section_bullets WHERE section_id = $1 ORDER BY bullet_order",
            )
            .bind(section_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ca_core::Error::Storage(format!("Failed to load bullets: {}", e)))?;

            sections.push(ArticleSection {
                heading: row.get::<Option<String>, _>("heading").unwrap_or_default(),
                body_text: row.get::<Option<String>, _>("body_text").unwrap_or_default(),
                kind: SectionKind::from_str(&row.get::<Option<String>, _>("kind").unwrap_or_default()),
                bullets: bullet_rows.into_iter().map(|b| b.get("content")).collect(),
            });
        }
        Ok(sections)
    }
}

#[async_trait]
impl ArticleStore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ca_core::Error::Storage(format!("Database unreachable: {}", e)))?;
        Ok(())
    }

    async fn exists(&self, url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM articles WHERE url = $1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ca_core::Error::Storage(format!("Failed to check article existence: {}", e)))?;
        Ok(row.is_some())
    }

    async fn upsert(&self, article: &Article) -> Result<Upserted> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| ca_core::Error::Storage(format!("Failed to open transaction: {}", e)))?;

        if let Some(existing) = sqlx::query("SELECT id FROM articles WHERE url = $1")
            .bind(&article.url)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| ca_core::Error::Storage(format!("Failed to check article existence: {}", e)))?
        {
            debug!(url = %article.url, "article already stored, skipping");
            return Ok(Upserted {
                id: existing.get("id"),
                created: false,
            });
        }

        let article_id = Uuid::new_v4();
        let inserted = sqlx::query(
            r#"
            INSERT INTO articles
            (id, title, url, image_url, published_date_raw, published_date, source_name, intro, importance_rating, scraped_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(article_id)
        .bind(&article.title)
        .bind(&article.url)
        .bind(&article.image_url)
        .bind(&article.published_date_raw)
        .bind(article.published_date)
        .bind(article.source.as_str())
        .bind(&article.intro)
        .bind(&article.importance_rating)
        .bind(article.scraped_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| ca_core::Error::Storage(format!("Failed to insert article: {}", e)))?;

        // Lost a race with a concurrent insert of the same URL; the row
        // that won keeps its sections.
        if inserted.rows_affected() == 0 {
            let existing = sqlx::query("SELECT id FROM articles WHERE url = $1")
                .bind(&article.url)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| ca_core::Error::Storage(format!("Failed to resolve conflicting article: {}", e)))?;
            return Ok(Upserted {
                id: existing.get("id"),
                created: false,
            });
        }

        for (section_order, section) in article.sections.iter().enumerate() {
            let section_id = Uuid::new_v4();
            sqlx::query(
                r#"
                INSERT INTO sections (id, article_id, heading, body_text, kind, sequence_order)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(section_id)
            .bind(article_id)
            .bind(&section.heading)
            .bind(&section.body_text)
            .bind(section.kind.as_str())
            .bind(section_order as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| ca_core::Error::Storage(format!("Failed to insert section: {}", e)))?;

            for (bullet_order, bullet) in section.bullets.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO section_bullets (id, section_id, content, bullet_order)
                    VALUES ($1, $2, $3, $4)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(section_id)
                .bind(bullet)
                .bind(bullet_order as i32)
                .execute(&mut *tx)
                .await
                .map_err(|e| ca_core::Error::Storage(format!("Failed to insert bullet: {}", e)))?;
            }
        }

        tx.commit()
            .await
            .map_err(|e| ca_core::Error::Storage(format!("Failed to commit article: {}", e)))?;

        info!(url = %article.url, title = %article.title, "stored new article");
        Ok(Upserted {
            id: article_id,
            created: true,
        })
    }

    async fn latest(&self, limit: usize) -> Result<Vec<Article>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, url, image_url, published_date_raw, published_date,
                   source_name, intro, importance_rating, scraped_at
            FROM articles
            ORDER BY published_date DESC NULLS LAST, scraped_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ca_core::Error::Storage(format!("Failed to list articles: {}", e)))?;

        let mut articles = Vec::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.get("id");
            let source_name: String = row.get("source_name");
            articles.push(Article {
                url: row.get("url"),
                title: row.get("title"),
                intro: row.get::<Option<String>, _>("intro").unwrap_or_default(),
                image_url: row.get("image_url"),
                published_date_raw: row
                    .get::<Option<String>, _>("published_date_raw")
                    .unwrap_or_else(|| "N/A".to_string()),
                published_date: row.get("published_date"),
                importance_rating: row.get("importance_rating"),
                source: SourceName::parse_cli_name(&source_name)
                    .ok_or_else(|| ca_core::Error::Storage(format!("Unknown source in database: {}", source_name)))?,
                sections: self.load_sections(id).await?,
                scraped_at: row.get("scraped_at"),
            });
        }
        Ok(articles)
    }
}

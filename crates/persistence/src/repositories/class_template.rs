//! Class template repository for database operations.

use domain::models::NewClassTemplate;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::ClassTemplateEntity;
use crate::metrics::QueryTimer;

/// Repository for class template database operations.
#[derive(Clone)]
pub struct ClassTemplateRepository {
    pool: PgPool,
}

impl ClassTemplateRepository {
    /// Creates a new ClassTemplateRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new template.
    pub async fn create(&self, data: &NewClassTemplate) -> Result<ClassTemplateEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_class_template");
        let result = sqlx::query_as::<_, ClassTemplateEntity>(
            r#"
            INSERT INTO class_templates (
                organization_id, name, class_type, duration_minutes, capacity,
                location, requires_subscription, drop_in_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, organization_id, name, class_type, duration_minutes, capacity,
                      location, requires_subscription, drop_in_price, created_at
            "#,
        )
        .bind(data.organization_id)
        .bind(&data.name)
        .bind(&data.class_type)
        .bind(data.duration_minutes)
        .bind(data.capacity)
        .bind(&data.location)
        .bind(data.requires_subscription)
        .bind(data.drop_in_price)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find a template by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ClassTemplateEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_class_template_by_id");
        let result = sqlx::query_as::<_, ClassTemplateEntity>(
            r#"
            SELECT id, organization_id, name, class_type, duration_minutes, capacity,
                   location, requires_subscription, drop_in_price, created_at
            FROM class_templates
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}

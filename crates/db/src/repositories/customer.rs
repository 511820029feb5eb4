use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use gearbook_core::domain::address::AddressEntry;
use gearbook_core::domain::customer::{
    CustomerId, CustomerRecord, CustomerType, FleetDetails, MarketingPreferences,
};
use gearbook_core::patch::RecordPatch;

use super::{CustomerStore, RepositoryError};
use crate::DbPool;

pub struct SqlCustomerStore {
    pool: DbPool,
}

impl SqlCustomerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl CustomerStore for SqlCustomerStore {
    async fn find_by_id(&self, id: &CustomerId) -> Result<Option<CustomerRecord>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        read_row(&mut conn, id).await
    }

    async fn upsert(&self, record: CustomerRecord) -> Result<CustomerRecord, RepositoryError> {
        let id = record.id.unwrap_or_else(CustomerId::new);

        let mut tx = self.pool.begin().await?;
        write_row(&mut *tx, &id, &record).await?;
        let stored = read_row(&mut *tx, &id)
            .await?
            .ok_or_else(|| RepositoryError::Decode("upserted row did not read back".to_string()))?;
        tx.commit().await?;

        Ok(stored)
    }

    async fn update_fields(
        &self,
        id: &CustomerId,
        patch: RecordPatch,
    ) -> Result<CustomerRecord, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut record =
            read_row(&mut *tx, id).await?.ok_or(RepositoryError::NotFound(*id))?;
        patch
            .apply(&mut record)
            .map_err(|err| RepositoryError::Decode(err.to_string()))?;

        write_row(&mut *tx, id, &record).await?;
        let stored = read_row(&mut *tx, id)
            .await?
            .ok_or_else(|| RepositoryError::Decode("updated row did not read back".to_string()))?;
        tx.commit().await?;

        Ok(stored)
    }
}

async fn write_row(
    conn: &mut SqliteConnection,
    id: &CustomerId,
    record: &CustomerRecord,
) -> Result<(), RepositoryError> {
    let customer_type = record
        .customer_type
        .ok_or_else(|| RepositoryError::Decode("customer_type is required to persist".to_string()))?;

    let fleet_details = record
        .fleet_details
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| RepositoryError::Decode(err.to_string()))?;
    let address_book = serde_json::to_string(&record.address_book)
        .map_err(|err| RepositoryError::Decode(err.to_string()))?;
    let marketing_preferences = serde_json::to_string(&record.marketing_preferences)
        .map_err(|err| RepositoryError::Decode(err.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, organization_id, customer_type, first_name, last_name, email, phone,
            street_address, city, state_province, postal_code, country, timezone,
            company_name, business_classification_id, company_size, fleet_details,
            address_book, marketing_preferences, customer_since, loyalty_points,
            created_by, updated_by, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?,
                strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        ON CONFLICT(id) DO UPDATE SET
            organization_id = excluded.organization_id,
            customer_type = excluded.customer_type,
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            email = excluded.email,
            phone = excluded.phone,
            street_address = excluded.street_address,
            city = excluded.city,
            state_province = excluded.state_province,
            postal_code = excluded.postal_code,
            country = excluded.country,
            timezone = excluded.timezone,
            company_name = excluded.company_name,
            business_classification_id = excluded.business_classification_id,
            company_size = excluded.company_size,
            fleet_details = excluded.fleet_details,
            address_book = excluded.address_book,
            marketing_preferences = excluded.marketing_preferences,
            customer_since = excluded.customer_since,
            loyalty_points = excluded.loyalty_points,
            updated_by = excluded.updated_by,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(id.to_string())
    .bind(record.organization_id.map(|org| org.to_string()))
    .bind(customer_type.as_str())
    .bind(&record.first_name)
    .bind(&record.last_name)
    .bind(&record.email)
    .bind(&record.phone)
    .bind(&record.street_address)
    .bind(&record.city)
    .bind(&record.state_province)
    .bind(&record.postal_code)
    .bind(&record.country)
    .bind(&record.timezone)
    .bind(&record.company_name)
    .bind(&record.business_classification_id)
    .bind(&record.company_size)
    .bind(fleet_details)
    .bind(address_book)
    .bind(marketing_preferences)
    .bind(record.customer_since.map(|since| since.to_rfc3339()))
    .bind(record.loyalty_points)
    .bind(&record.created_by)
    .bind(&record.updated_by)
    .execute(conn)
    .await?;

    Ok(())
}

async fn read_row(
    conn: &mut SqliteConnection,
    id: &CustomerId,
) -> Result<Option<CustomerRecord>, RepositoryError> {
    let row = sqlx::query("SELECT * FROM customers WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(conn)
        .await?;

    row.map(|row| decode_row(&row)).transpose()
}

fn decode_row(row: &sqlx::sqlite::SqliteRow) -> Result<CustomerRecord, RepositoryError> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map(CustomerId)
        .map_err(|err| RepositoryError::Decode(format!("bad customer id: {err}")))?;

    let organization_id: Option<String> = row.get("organization_id");
    let organization_id = organization_id
        .map(|raw| Uuid::parse_str(&raw))
        .transpose()
        .map_err(|err| RepositoryError::Decode(format!("bad organization id: {err}")))?;

    let customer_type: String = row.get("customer_type");
    let customer_type = CustomerType::parse(&customer_type).ok_or_else(|| {
        RepositoryError::Decode(format!("unrecognized customer_type `{customer_type}`"))
    })?;

    let fleet_details: Option<String> = row.get("fleet_details");
    let fleet_details: Option<FleetDetails> = fleet_details
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|err| RepositoryError::Decode(format!("bad fleet_details: {err}")))?;

    let address_book: String = row.get("address_book");
    let address_book: Vec<AddressEntry> = serde_json::from_str(&address_book)
        .map_err(|err| RepositoryError::Decode(format!("bad address_book: {err}")))?;

    let marketing_preferences: String = row.get("marketing_preferences");
    let marketing_preferences: MarketingPreferences =
        serde_json::from_str(&marketing_preferences)
            .map_err(|err| RepositoryError::Decode(format!("bad marketing_preferences: {err}")))?;

    Ok(CustomerRecord {
        id: Some(id),
        organization_id,
        customer_type: Some(customer_type),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        street_address: row.get("street_address"),
        city: row.get("city"),
        state_province: row.get("state_province"),
        postal_code: row.get("postal_code"),
        country: row.get("country"),
        timezone: row.get("timezone"),
        company_name: row.get("company_name"),
        business_classification_id: row.get("business_classification_id"),
        company_size: row.get("company_size"),
        fleet_details,
        address_book,
        marketing_preferences,
        customer_since: parse_timestamp(row.get("customer_since"), "customer_since")?,
        loyalty_points: row.get("loyalty_points"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
        updated_at: parse_timestamp(row.get("updated_at"), "updated_at")?,
    })
}

fn parse_timestamp(
    raw: Option<String>,
    column: &str,
) -> Result<Option<DateTime<Utc>>, RepositoryError> {
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|err| RepositoryError::Decode(format!("bad {column}: {err}")))
    })
    .transpose()
}

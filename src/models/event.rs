use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::media::media_url;
use crate::utils::error::AppError;

/// Validated event fields shared by creation and editing. Media paths are
/// filled in by the handler after the uploads land on disk.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub category: String,
    pub max_attendees: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration: Option<Decimal>,
    pub location: String,
    pub price: Option<Decimal>,
    pub guest: String,
    pub guest_image: Option<String>,
    pub image: Option<String>,
}

impl NewEvent {
    /// Coerces the text parts of a multipart form. Missing or malformed
    /// required fields fail with a 400 naming the field.
    pub fn from_text_fields(fields: &HashMap<String, String>) -> Result<NewEvent, AppError> {
        let title = required(fields, "title")?;
        let category = required(fields, "category")?;
        let location = required(fields, "location")?;

        let max_attendees: i32 = required(fields, "max_attendees")?
            .parse()
            .map_err(|_| invalid("max_attendees"))?;
        if max_attendees <= 0 {
            return Err(AppError::Validation(
                "max_attendees must be a positive integer".to_string(),
            ));
        }

        let date = NaiveDate::parse_from_str(&required(fields, "date")?, "%Y-%m-%d")
            .map_err(|_| invalid("date"))?;
        let time = parse_time(&required(fields, "time")?)?;

        let duration = optional_decimal(fields, "duration")?;
        let price = optional_decimal(fields, "price")?;
        if let Some(price) = price {
            if price < Decimal::ZERO {
                return Err(AppError::Validation(
                    "price must not be negative".to_string(),
                ));
            }
        }

        Ok(NewEvent {
            title,
            description: fields.get("description").cloned().unwrap_or_default(),
            category,
            max_attendees,
            date,
            time,
            duration,
            location,
            price,
            guest: fields.get("guest").cloned().unwrap_or_default(),
            guest_image: None,
            image: None,
        })
    }
}

fn required(fields: &HashMap<String, String>, name: &str) -> Result<String, AppError> {
    fields
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Validation(format!("Field '{}' is required", name)))
}

fn invalid(name: &str) -> AppError {
    AppError::Validation(format!("Invalid value for field '{}'", name))
}

fn parse_time(value: &str) -> Result<NaiveTime, AppError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| invalid("time"))
}

fn optional_decimal(
    fields: &HashMap<String, String>,
    name: &str,
) -> Result<Option<Decimal>, AppError> {
    match fields.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => Decimal::from_str(raw).map(Some).map_err(|_| invalid(name)),
        None => Ok(None),
    }
}

/// One catalog row joined with its organizer and booking aggregates.
#[derive(Debug, Clone, FromRow)]
pub struct EventDetail {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub max_attendees: i32,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration: Option<Decimal>,
    pub location: String,
    pub price: Option<Decimal>,
    pub guest: String,
    pub guest_image: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub organizer: String,
    pub organizer_email: String,
    pub total_bookings: i64,
    pub tickets_sold: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct GalleryImage {
    pub event_id: Uuid,
    pub image: String,
}

/// Catalog projection returned by every event endpoint.
#[derive(Debug, Serialize)]
pub struct EventJson {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub duration: Option<Decimal>,
    pub location: String,
    pub price: Option<Decimal>,
    pub guest: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub organizer: String,
    pub organizer_email: String,
    pub total_bookings: i64,
    pub max_attendees: i32,
    pub tickets_sold: i64,
    /// Not clamped: corrupt out-of-band data may drive this negative.
    pub tickets_left: i64,
    pub guest_image: Option<String>,
    pub gallery: Vec<String>,
}

impl EventDetail {
    pub fn into_json(self, gallery: Vec<String>, public_base: Option<&str>) -> EventJson {
        let tickets_left = i64::from(self.max_attendees) - self.tickets_sold;
        EventJson {
            id: self.id,
            title: self.title,
            description: self.description,
            category: self.category,
            date: self.date,
            time: self.time,
            duration: self.duration,
            location: self.location,
            price: self.price,
            guest: self.guest,
            image: self.image.as_deref().map(|p| media_url(public_base, p)),
            created_at: self.created_at,
            organizer: self.organizer,
            organizer_email: self.organizer_email,
            total_bookings: self.total_bookings,
            max_attendees: self.max_attendees,
            tickets_sold: self.tickets_sold,
            tickets_left,
            guest_image: self
                .guest_image
                .as_deref()
                .map(|p| media_url(public_base, p)),
            gallery: gallery
                .into_iter()
                .map(|p| media_url(public_base, &p))
                .collect(),
        }
    }
}

const DETAIL_SELECT: &str = "SELECT e.id, e.user_id, e.title, e.description, e.category, \
     e.max_attendees, e.date, e.time, e.duration, e.location, e.price, e.guest, \
     e.guest_image, e.image, e.created_at, \
     COALESCE(NULLIF(u.first_name, ''), u.username) AS organizer, \
     u.email AS organizer_email, \
     (SELECT COUNT(*) FROM bookings b WHERE b.event_id = e.id) AS total_bookings, \
     (SELECT COALESCE(SUM(b.quantity), 0) FROM bookings b WHERE b.event_id = e.id) AS tickets_sold \
     FROM events e JOIN users u ON u.id = e.user_id";

const DETAIL_ORDER: &str = "ORDER BY e.created_at, e.id";

/// Escapes LIKE metacharacters so a search for "100%" matches literally.
fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

pub fn like_pattern(raw: &str) -> String {
    format!("%{}%", escape_like(raw))
}

pub struct Event;

impl Event {
    pub async fn create(pool: &PgPool, owner: Uuid, new: &NewEvent) -> Result<Uuid, AppError> {
        let id: Uuid = sqlx::query_scalar(
            "INSERT INTO events (user_id, title, description, category, max_attendees, \
             date, time, duration, location, price, guest, guest_image, image) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING id",
        )
        .bind(owner)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.max_attendees)
        .bind(new.date)
        .bind(new.time)
        .bind(new.duration)
        .bind(&new.location)
        .bind(new.price)
        .bind(&new.guest)
        .bind(&new.guest_image)
        .bind(&new.image)
        .fetch_one(pool)
        .await?;
        Ok(id)
    }

    /// Owner-scoped update; images keep their stored value when the form
    /// did not upload a replacement. Returns false when no owned row
    /// matched.
    pub async fn update_owned(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
        new: &NewEvent,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE events SET title = $3, description = $4, category = $5, \
             max_attendees = $6, date = $7, time = $8, duration = $9, location = $10, \
             price = $11, guest = $12, \
             guest_image = COALESCE($13, guest_image), image = COALESCE($14, image) \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner)
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.max_attendees)
        .bind(new.date)
        .bind(new.time)
        .bind(new.duration)
        .bind(&new.location)
        .bind(new.price)
        .bind(&new.guest)
        .bind(&new.guest_image)
        .bind(&new.image)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Full catalog, optionally narrowed by a free-text query matched
    /// case-insensitively against title, category, location, or the date's
    /// textual representation.
    pub async fn list(pool: &PgPool, search: Option<&str>) -> Result<Vec<EventDetail>, AppError> {
        match search.map(str::trim).filter(|q| !q.is_empty()) {
            Some(query) => {
                let sql = format!(
                    "{} WHERE e.title ILIKE $1 OR e.category ILIKE $1 \
                     OR e.location ILIKE $1 OR e.date::TEXT ILIKE $1 {}",
                    DETAIL_SELECT, DETAIL_ORDER
                );
                Ok(sqlx::query_as::<_, EventDetail>(&sql)
                    .bind(like_pattern(query))
                    .fetch_all(pool)
                    .await?)
            }
            None => {
                let sql = format!("{} {}", DETAIL_SELECT, DETAIL_ORDER);
                Ok(sqlx::query_as::<_, EventDetail>(&sql).fetch_all(pool).await?)
            }
        }
    }

    pub async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<EventDetail>, AppError> {
        let sql = format!("{} WHERE e.id = $1", DETAIL_SELECT);
        Ok(sqlx::query_as::<_, EventDetail>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn find_detail_owned(
        pool: &PgPool,
        id: Uuid,
        owner: Uuid,
    ) -> Result<Option<EventDetail>, AppError> {
        let sql = format!("{} WHERE e.id = $1 AND e.user_id = $2", DETAIL_SELECT);
        Ok(sqlx::query_as::<_, EventDetail>(&sql)
            .bind(id)
            .bind(owner)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn list_by_owner(pool: &PgPool, owner: Uuid) -> Result<Vec<EventDetail>, AppError> {
        let sql = format!("{} WHERE e.user_id = $1 {}", DETAIL_SELECT, DETAIL_ORDER);
        Ok(sqlx::query_as::<_, EventDetail>(&sql)
            .bind(owner)
            .fetch_all(pool)
            .await?)
    }

    pub async fn add_gallery_image(
        pool: &PgPool,
        event_id: Uuid,
        path: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO event_gallery (event_id, image) VALUES ($1, $2)")
            .bind(event_id)
            .bind(path)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Gallery paths for a set of events, keyed by event id and ordered by
    /// insertion.
    pub async fn galleries_for(
        pool: &PgPool,
        event_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, AppError> {
        if event_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, GalleryImage>(
            "SELECT event_id, image FROM event_gallery WHERE event_id = ANY($1) ORDER BY id",
        )
        .bind(event_ids)
        .fetch_all(pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<String>> = HashMap::new();
        for row in rows {
            grouped.entry(row.event_id).or_default().push(row.image);
        }
        Ok(grouped)
    }

    /// Enriches detail rows into the catalog projection, attaching each
    /// event's gallery and resolving media URLs.
    pub async fn project(
        pool: &PgPool,
        details: Vec<EventDetail>,
        public_base: Option<&str>,
    ) -> Result<Vec<EventJson>, AppError> {
        let ids: Vec<Uuid> = details.iter().map(|d| d.id).collect();
        let mut galleries = Self::galleries_for(pool, &ids).await?;
        Ok(details
            .into_iter()
            .map(|detail| {
                let gallery = galleries.remove(&detail.id).unwrap_or_default();
                detail.into_json(gallery, public_base)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn valid_fields() -> HashMap<String, String> {
        fields(&[
            ("title", "Summer Fest"),
            ("category", "music"),
            ("location", "Riverside Park"),
            ("max_attendees", "250"),
            ("date", "2026-07-14"),
            ("time", "18:30"),
            ("price", "49.99"),
            ("guest", "The Headliners"),
        ])
    }

    #[test]
    fn parses_a_complete_form() {
        let new = NewEvent::from_text_fields(&valid_fields()).unwrap();
        assert_eq!(new.title, "Summer Fest");
        assert_eq!(new.max_attendees, 250);
        assert_eq!(new.date, NaiveDate::from_ymd_opt(2026, 7, 14).unwrap());
        assert_eq!(new.time, NaiveTime::from_hms_opt(18, 30, 0).unwrap());
        assert_eq!(new.price, Some(Decimal::from_str("49.99").unwrap()));
        assert_eq!(new.description, "");
    }

    #[test]
    fn accepts_seconds_in_the_time_field() {
        let mut f = valid_fields();
        f.insert("time".into(), "18:30:45".into());
        let new = NewEvent::from_text_fields(&f).unwrap();
        assert_eq!(new.time, NaiveTime::from_hms_opt(18, 30, 45).unwrap());
    }

    #[test]
    fn rejects_missing_title() {
        let mut f = valid_fields();
        f.remove("title");
        let err = NewEvent::from_text_fields(&f).unwrap_err();
        assert!(err.to_string().contains("title"));
    }

    #[test]
    fn rejects_zero_capacity() {
        let mut f = valid_fields();
        f.insert("max_attendees".into(), "0".into());
        assert!(NewEvent::from_text_fields(&f).is_err());
    }

    #[test]
    fn rejects_negative_price() {
        let mut f = valid_fields();
        f.insert("price".into(), "-1".into());
        assert!(NewEvent::from_text_fields(&f).is_err());
    }

    #[test]
    fn empty_price_means_free() {
        let mut f = valid_fields();
        f.insert("price".into(), "".into());
        let new = NewEvent::from_text_fields(&f).unwrap();
        assert_eq!(new.price, None);
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }

    #[test]
    fn tickets_left_is_not_clamped() {
        let detail = EventDetail {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Oversold".into(),
            description: "".into(),
            category: "music".into(),
            max_attendees: 10,
            date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            time: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            duration: None,
            location: "Hall".into(),
            price: None,
            guest: "".into(),
            guest_image: None,
            image: None,
            created_at: Utc::now(),
            organizer: "amira".into(),
            organizer_email: "amira@example.com".into(),
            total_bookings: 3,
            tickets_sold: 12,
        };
        let json = detail.into_json(vec![], None);
        assert_eq!(json.tickets_left, -2);
    }

    #[test]
    fn projection_resolves_media_urls() {
        let detail = EventDetail {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Gala".into(),
            description: "".into(),
            category: "charity".into(),
            max_attendees: 100,
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            time: NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
            duration: None,
            location: "Grand Hotel".into(),
            price: None,
            guest: "".into(),
            guest_image: None,
            image: Some("covers/a.png".into()),
            created_at: Utc::now(),
            organizer: "amira".into(),
            organizer_email: "amira@example.com".into(),
            total_bookings: 0,
            tickets_sold: 0,
        };
        let json = detail.into_json(
            vec!["gallery/b.png".into()],
            Some("http://localhost:3001"),
        );
        assert_eq!(
            json.image.as_deref(),
            Some("http://localhost:3001/media/covers/a.png")
        );
        assert_eq!(json.gallery, vec!["http://localhost:3001/media/gallery/b.png"]);
    }
}

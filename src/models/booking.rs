use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::media::{self, media_url, MediaStore};
use crate::models::ticket::{self, Ticket};
use crate::utils::error::AppError;
use crate::utils::qr;

/// Length of the `"BK" + letter` prefix on derived identifiers.
const CUSTOM_ID_PREFIX_LEN: usize = 3;

/// First uppercase letter of the event title, or 'E' for an empty title.
pub fn event_letter(title: &str) -> char {
    title
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('E')
}

/// Human-readable booking identifier: `"BK" + event letter + surrogate key`.
/// Derived once the row's own key exists; immutable afterwards.
pub fn derive_custom_id(event_title: &str, booking_id: i64) -> String {
    format!("BK{}{}", event_letter(event_title), booking_id)
}

/// Strips the fixed 3-character prefix and parses the remainder as the
/// surrogate key. `None` for anything that does not parse.
pub fn parse_custom_id(custom_id: &str) -> Option<i64> {
    custom_id.get(CUSTOM_ID_PREFIX_LEN..)?.parse().ok()
}

/// One booking joined with its purchaser and event, ready for projection.
#[derive(Debug, Clone, FromRow)]
pub struct BookingDetail {
    pub id: i64,
    pub user_id: Uuid,
    pub custom_id: Option<String>,
    pub quantity: i32,
    pub booked_at: DateTime<Utc>,
    pub qr_code: Option<String>,
    pub booked_by: String,
    pub event_title: String,
    pub event_image: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub event_location: String,
    pub event_price: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct BookingJson {
    pub id: i64,
    pub custom_id: Option<String>,
    pub booked_by: String,
    pub event_title: String,
    pub event_image: Option<String>,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub event_location: String,
    pub quantity: i32,
    pub booked_at: DateTime<Utc>,
    pub total_payment: Decimal,
    pub tickets_id: String,
    pub qr_code: Option<String>,
}

impl BookingDetail {
    pub fn into_json(self, ticket_numbers: &[i32], public_base: Option<&str>) -> BookingJson {
        let total_payment =
            self.event_price.unwrap_or_default() * Decimal::from(self.quantity);
        let letter = event_letter(&self.event_title);
        BookingJson {
            id: self.id,
            custom_id: self.custom_id,
            booked_by: self.booked_by,
            event_title: self.event_title,
            event_image: self
                .event_image
                .as_deref()
                .map(|p| media_url(public_base, p)),
            event_date: self.event_date,
            event_time: self.event_time,
            event_location: self.event_location,
            quantity: self.quantity,
            booked_at: self.booked_at,
            total_payment,
            tickets_id: ticket::join_labels(letter, ticket_numbers),
            qr_code: self.qr_code.as_deref().map(|p| media_url(public_base, p)),
        }
    }
}

const DETAIL_SELECT: &str = "SELECT b.id, b.user_id, b.custom_id, b.quantity, b.booked_at, \
     b.qr_code, u.username AS booked_by, e.title AS event_title, e.image AS event_image, \
     e.date AS event_date, e.time AS event_time, e.location AS event_location, \
     e.price AS event_price \
     FROM bookings b \
     JOIN users u ON u.id = b.user_id \
     JOIN events e ON e.id = b.event_id";

pub struct Booking;

impl Booking {
    /// Books `quantity` tickets for `event_id`.
    ///
    /// The whole sequence runs in one transaction with the event row locked
    /// FOR UPDATE, so concurrent bookings for the same event serialize and
    /// the capacity and numbering invariants hold: the per-event sum of
    /// quantities never exceeds capacity, and ticket numbers continue the
    /// per-event sequence without collisions.
    ///
    /// Returns the new booking's surrogate key; callers fetch the
    /// projection afterwards.
    pub async fn create(
        pool: &PgPool,
        media_store: &MediaStore,
        frontend_base_url: &str,
        user_id: Uuid,
        event_id: Uuid,
        quantity: i32,
    ) -> Result<i64, AppError> {
        let mut tx = pool.begin().await?;

        let event: Option<(String, i32)> =
            sqlx::query_as("SELECT title, max_attendees FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (title, max_attendees) =
            event.ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;

        let sold: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0) FROM bookings WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;

        let available = i64::from(max_attendees) - sold;
        if i64::from(quantity) > available {
            return Err(AppError::CapacityExceeded { available });
        }

        let booking_id: i64 = sqlx::query_scalar(
            "INSERT INTO bookings (user_id, event_id, quantity) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(event_id)
        .bind(quantity)
        .fetch_one(&mut *tx)
        .await?;

        // The derived identifier embeds the generated key, so it is
        // backfilled as a second write inside the same transaction.
        let custom_id = derive_custom_id(&title, booking_id);
        sqlx::query("UPDATE bookings SET custom_id = $1 WHERE id = $2")
            .bind(&custom_id)
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        let booking_url = format!(
            "{}/booking/{}",
            frontend_base_url.trim_end_matches('/'),
            custom_id
        );
        let voucher = qr::voucher_png(&booking_url)?;
        let file_name = format!("booking_{}_qr.png", booking_id);
        let voucher_path = media_store
            .save(media::VOUCHERS, &file_name, &voucher)
            .await?;
        sqlx::query("UPDATE bookings SET qr_code = $1 WHERE id = $2")
            .bind(&voucher_path)
            .bind(booking_id)
            .execute(&mut *tx)
            .await?;

        let max_number: i32 =
            sqlx::query_scalar("SELECT COALESCE(MAX(ticket_number), 0) FROM tickets WHERE event_id = $1")
                .bind(event_id)
                .fetch_one(&mut *tx)
                .await?;
        sqlx::query(
            "INSERT INTO tickets (booking_id, event_id, ticket_number) \
             SELECT $1, $2, n FROM generate_series($3::INT, $4::INT) AS n",
        )
        .bind(booking_id)
        .bind(event_id)
        .bind(max_number + 1)
        .bind(max_number + quantity)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(booking_id)
    }

    pub async fn find_for_user(
        pool: &PgPool,
        id: i64,
        user_id: Uuid,
    ) -> Result<Option<BookingDetail>, AppError> {
        let sql = format!("{} WHERE b.id = $1 AND b.user_id = $2", DETAIL_SELECT);
        Ok(sqlx::query_as::<_, BookingDetail>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?)
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<BookingDetail>, AppError> {
        let sql = format!("{} WHERE b.user_id = $1 ORDER BY b.id", DETAIL_SELECT);
        Ok(sqlx::query_as::<_, BookingDetail>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await?)
    }

    pub async fn list_all(pool: &PgPool) -> Result<Vec<BookingDetail>, AppError> {
        let sql = format!("{} ORDER BY b.id", DETAIL_SELECT);
        Ok(sqlx::query_as::<_, BookingDetail>(&sql)
            .fetch_all(pool)
            .await?)
    }

    /// Owner-scoped cancellation; tickets go with the booking via cascade.
    /// Ticket-number gaps are left as-is: uniqueness, not density, is the
    /// invariant.
    pub async fn delete_owned(pool: &PgPool, id: i64, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM bookings WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Enriches detail rows into the booking projection, attaching each
    /// booking's ticket labels.
    pub async fn project(
        pool: &PgPool,
        details: Vec<BookingDetail>,
        public_base: Option<&str>,
    ) -> Result<Vec<BookingJson>, AppError> {
        let ids: Vec<i64> = details.iter().map(|d| d.id).collect();
        let numbers = Ticket::numbers_by_booking(pool, &ids).await?;
        Ok(details
            .into_iter()
            .map(|detail| {
                let ticket_numbers = numbers.get(&detail.id).cloned().unwrap_or_default();
                detail.into_json(&ticket_numbers, public_base)
            })
            .collect())
    }

    /// Projections for several users at once, grouped by purchaser.
    pub async fn project_grouped(
        pool: &PgPool,
        details: Vec<BookingDetail>,
        public_base: Option<&str>,
    ) -> Result<HashMap<Uuid, Vec<BookingJson>>, AppError> {
        let ids: Vec<i64> = details.iter().map(|d| d.id).collect();
        let numbers = Ticket::numbers_by_booking(pool, &ids).await?;
        let mut grouped: HashMap<Uuid, Vec<BookingJson>> = HashMap::new();
        for detail in details {
            let user_id = detail.user_id;
            let ticket_numbers = numbers.get(&detail.id).cloned().unwrap_or_default();
            grouped
                .entry(user_id)
                .or_default()
                .push(detail.into_json(&ticket_numbers, public_base));
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn custom_id_uses_the_event_letter() {
        assert_eq!(derive_custom_id("Summer Fest", 42), "BKS42");
    }

    #[test]
    fn custom_id_uppercases_the_first_letter() {
        assert_eq!(derive_custom_id("jazz night", 7), "BKJ7");
    }

    #[test]
    fn empty_title_falls_back_to_e() {
        assert_eq!(derive_custom_id("", 3), "BKE3");
    }

    #[test]
    fn non_alphabetic_first_character_is_kept() {
        assert_eq!(derive_custom_id("2-day expo", 9), "BK29");
    }

    #[test]
    fn parse_recovers_the_surrogate_key() {
        assert_eq!(parse_custom_id("BKS42"), Some(42));
        assert_eq!(parse_custom_id("BKX1"), Some(1));
    }

    #[test]
    fn parse_rejects_non_numeric_remainders() {
        assert_eq!(parse_custom_id("BKSabc"), None);
        assert_eq!(parse_custom_id("BKS"), None);
        assert_eq!(parse_custom_id("BK"), None);
        assert_eq!(parse_custom_id(""), None);
    }

    #[test]
    fn derived_ids_round_trip() {
        let custom = derive_custom_id("Summer Fest", 123);
        assert_eq!(parse_custom_id(&custom), Some(123));
    }

    fn detail(quantity: i32, price: Option<&str>) -> BookingDetail {
        BookingDetail {
            id: 1,
            user_id: Uuid::new_v4(),
            custom_id: Some("BKS1".into()),
            quantity,
            booked_at: Utc::now(),
            qr_code: Some("vouchers/booking_1_qr.png".into()),
            booked_by: "amira".into(),
            event_title: "Summer Fest".into(),
            event_image: None,
            event_date: NaiveDate::from_ymd_opt(2026, 7, 14).unwrap(),
            event_time: NaiveTime::from_hms_opt(18, 30, 0).unwrap(),
            event_location: "Riverside Park".into(),
            event_price: price.map(|p| Decimal::from_str(p).unwrap()),
        }
    }

    #[test]
    fn total_payment_is_price_times_quantity() {
        let json = detail(3, Some("49.99")).into_json(&[4, 5, 6], None);
        assert_eq!(json.total_payment, Decimal::from_str("149.97").unwrap());
        assert_eq!(json.tickets_id, "S4, S5, S6");
    }

    #[test]
    fn free_event_totals_zero() {
        let json = detail(2, None).into_json(&[1, 2], None);
        assert_eq!(json.total_payment, Decimal::ZERO);
    }

    #[test]
    fn voucher_url_is_resolved() {
        let json = detail(1, None).into_json(&[1], Some("http://localhost:3001"));
        assert_eq!(
            json.qr_code.as_deref(),
            Some("http://localhost:3001/media/vouchers/booking_1_qr.png")
        );
    }
}

//! Catálogo turístico: destinos (:Spot), guías (:Guide) y reservas (:Booking).

use chrono::{SecondsFormat, Utc};
use neo4rs::{query, Graph, Node};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::models::{is_valid_id, Booking, Guide, NewBooking, NewGuide, NewSpot, Spot};

// --- Destinos ---

pub async fn list_spots(graph: &Graph) -> ApiResult<Vec<Spot>> {
    let mut cursor = graph
        .execute(query("MATCH (s:Spot) RETURN s ORDER BY s.created_at DESC"))
        .await?;

    let mut spots = Vec::new();
    while let Some(row) = cursor.next().await? {
        if let Some(node) = row.get::<Node>("s") {
            if let Some(spot) = spot_from_node(&node) {
                spots.push(spot);
            }
        }
    }
    Ok(spots)
}

pub async fn create_spot(graph: &Graph, payload: &NewSpot) -> ApiResult<Spot> {
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta el nombre del destino".to_string()))?;
    let location = payload
        .location
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta la ubicación del destino".to_string()))?;

    let spot = Spot {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        location: location.to_string(),
        description: payload.description.clone(),
        images: payload.images.clone().unwrap_or_default(),
        price: payload.price,
        average_rating: 0.0,
        rating_count: 0,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    graph
        .run(
            query(
                "CREATE (s:Spot {
                    id: $id, name: $name, location: $location,
                    description: $description, images: $images, price: $price,
                    average_rating: 0.0, rating_count: 0, created_at: $created_at
                })",
            )
            .param("id", spot.id.clone())
            .param("name", spot.name.clone())
            .param("location", spot.location.clone())
            .param("description", spot.description.clone().unwrap_or_default())
            .param("images", spot.images.clone())
            .param("price", spot.price.unwrap_or(0.0))
            .param("created_at", spot.created_at.clone()),
        )
        .await?;

    Ok(spot)
}

fn spot_from_node(node: &Node) -> Option<Spot> {
    Some(Spot {
        id: node.get("id")?,
        name: node.get("name")?,
        location: node.get("location")?,
        description: node.get::<String>("description").filter(|d| !d.is_empty()),
        images: node.get("images").unwrap_or_default(),
        price: node.get::<f64>("price").filter(|p| *p > 0.0),
        average_rating: node.get("average_rating").unwrap_or_default(),
        rating_count: node.get("rating_count").unwrap_or_default(),
        created_at: node.get("created_at").unwrap_or_default(),
    })
}

// --- Guías ---

pub async fn list_guides(graph: &Graph) -> ApiResult<Vec<Guide>> {
    let mut cursor = graph
        .execute(query("MATCH (g:Guide) RETURN g ORDER BY g.created_at DESC"))
        .await?;

    let mut guides = Vec::new();
    while let Some(row) = cursor.next().await? {
        if let Some(node) = row.get::<Node>("g") {
            if let Some(guide) = guide_from_node(&node) {
                guides.push(guide);
            }
        }
    }
    Ok(guides)
}

pub async fn create_guide(graph: &Graph, payload: &NewGuide) -> ApiResult<Guide> {
    let full_name = payload
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta el nombre del guía".to_string()))?;
    let email = payload
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta el email del guía".to_string()))?;
    let phone = payload
        .phone
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta el teléfono del guía".to_string()))?;

    let guide = Guide {
        id: Uuid::new_v4().to_string(),
        full_name: full_name.to_string(),
        email: email.to_lowercase(),
        phone: phone.to_string(),
        languages: payload.languages.clone().unwrap_or_default(),
        verified: false,
        average_rating: 0.0,
        rating_count: 0,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    graph
        .run(
            query(
                "CREATE (g:Guide {
                    id: $id, full_name: $full_name, email: $email, phone: $phone,
                    languages: $languages, verified: false,
                    average_rating: 0.0, rating_count: 0, created_at: $created_at
                })",
            )
            .param("id", guide.id.clone())
            .param("full_name", guide.full_name.clone())
            .param("email", guide.email.clone())
            .param("phone", guide.phone.clone())
            .param("languages", guide.languages.clone())
            .param("created_at", guide.created_at.clone()),
        )
        .await?;

    Ok(guide)
}

fn guide_from_node(node: &Node) -> Option<Guide> {
    Some(Guide {
        id: node.get("id")?,
        full_name: node.get("full_name")?,
        email: node.get("email")?,
        phone: node.get("phone").unwrap_or_default(),
        languages: node.get("languages").unwrap_or_default(),
        verified: node.get("verified").unwrap_or(false),
        average_rating: node.get("average_rating").unwrap_or_default(),
        rating_count: node.get("rating_count").unwrap_or_default(),
        created_at: node.get("created_at").unwrap_or_default(),
    })
}

// --- Reservas ---

pub async fn list_bookings(graph: &Graph) -> ApiResult<Vec<Booking>> {
    let mut cursor = graph
        .execute(query("MATCH (b:Booking) RETURN b ORDER BY b.created_at DESC"))
        .await?;

    let mut bookings = Vec::new();
    while let Some(row) = cursor.next().await? {
        if let Some(node) = row.get::<Node>("b") {
            if let Some(booking) = booking_from_node(&node) {
                bookings.push(booking);
            }
        }
    }
    Ok(bookings)
}

pub async fn create_booking(graph: &Graph, payload: &NewBooking) -> ApiResult<Booking> {
    let user_id = payload
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta el usuario de la reserva".to_string()))?;
    let spot_id = payload
        .spot_id
        .as_deref()
        .filter(|id| is_valid_id(id))
        .ok_or_else(|| {
            ApiError::Validation("El identificador del destino no es válido".to_string())
        })?;
    let date = payload
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or_else(|| ApiError::Validation("Falta la fecha de la reserva".to_string()))?;

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        spot_id: spot_id.to_string(),
        date: date.to_string(),
        average_rating: 0.0,
        rating_count: 0,
        created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };

    graph
        .run(
            query(
                "CREATE (b:Booking {
                    id: $id, user_id: $user_id, spot_id: $spot_id, date: $date,
                    average_rating: 0.0, rating_count: 0, created_at: $created_at
                })",
            )
            .param("id", booking.id.clone())
            .param("user_id", booking.user_id.clone())
            .param("spot_id", booking.spot_id.clone())
            .param("date", booking.date.clone())
            .param("created_at", booking.created_at.clone()),
        )
        .await?;

    Ok(booking)
}

fn booking_from_node(node: &Node) -> Option<Booking> {
    Some(Booking {
        id: node.get("id")?,
        user_id: node.get("user_id")?,
        spot_id: node.get("spot_id")?,
        date: node.get("date").unwrap_or_default(),
        average_rating: node.get("average_rating").unwrap_or_default(),
        rating_count: node.get("rating_count").unwrap_or_default(),
        created_at: node.get("created_at").unwrap_or_default(),
    })
}

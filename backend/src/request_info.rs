use rocket::request::{FromRequest, Outcome};
use rocket::Request;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub id: Uuid,
    pub ip: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestInfo {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let headers = req.headers();
        let ip = headers.get_one("X-Real-IP")
            .or_else(|| headers.get_one("X-Forwarded-For").and_then(|v| v.split(',').next()))
            .map(|v| v.trim().to_string())
            .or_else(|| req.client_ip().map(|ip| ip.to_string()))
            .unwrap_or_else(|| "0.0.0.0".to_string());

        Outcome::Success(RequestInfo {
            id: Uuid::new_v4(),
            ip,
        })
    }
}

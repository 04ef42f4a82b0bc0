use serde_json::{json, Value};
use tracing::info;

use super::{respond, CanvasTools};
use crate::error::is_error;
use crate::normalize::normalize;

impl CanvasTools {
    /// Verifies the access token against `users/self`; never cached
    pub async fn check_auth_status(&self) -> Value {
        let result = self
            .api
            .get_one("users/self", &[])
            .await
            .map(normalize);
        let user = respond(result, "verify your Canvas access token");
        if is_error(&user) {
            return user;
        }

        info!("access token verified");
        json!({
            "status": "authenticated",
            "user": {
                "id": user.get("id"),
                "name": user.get("name"),
                "login_id": user.get("login_id"),
                "email": user.get("email"),
            },
        })
    }
}

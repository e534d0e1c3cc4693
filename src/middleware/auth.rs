use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;

use crate::models::SubscriptionTier;
use crate::utils::error::AppError;

/// Claims emitidos pelo provedor de identidade/billing.
/// `iss` e `aud` são conferidos pelo `Validation` e não ficam aqui
/// (`aud` pode ser string ou lista).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user_id
    pub exp: usize,
    #[serde(default)]
    pub iat: usize,
    /// "Free" | "Basic" | "Pro"
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub subscription_type: Option<String>,
}

impl Claims {
    /// Plano do usuário; ausente ou desconhecido é erro, nunca "Free" implícito
    pub fn tier(&self) -> Result<SubscriptionTier, AppError> {
        self.subscription_type
            .as_deref()
            .ok_or_else(|| AppError::InvalidPlan("Missing subscription type".to_string()))?
            .parse()
    }
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
}

impl JwtSettings {
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        if claims.sub.trim().is_empty() {
            return Err(AppError::Unauthorized("Token has no subject".to_string()));
        }

        Ok(claims)
    }
}

pub struct AuthMiddleware {
    settings: Rc<JwtSettings>,
}

impl AuthMiddleware {
    pub fn new(settings: JwtSettings) -> Self {
        Self {
            settings: Rc::new(settings),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            settings: Rc::clone(&self.settings),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    settings: Rc<JwtSettings>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);

        let claims = match token {
            Some(token) => self.settings.verify(&token),
            None => Err(AppError::Unauthorized("Missing authorization token".to_string())),
        };

        match claims {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move {
                    let res = fut.await?;
                    Ok(res)
                })
            }
            Err(e) => {
                log::warn!("🚫 {} {} rejected: {}", req.method(), req.path(), e);
                Box::pin(async move { Err(e.into()) })
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};

    pub(crate) fn settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret".to_string(),
            issuer: "flashcard-service".to_string(),
            audience: "flashcard-api".to_string(),
        }
    }

    fn sign(claims: &Value) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    fn claims_with_audience(user_id: &str, subscription_type: Option<&str>, aud: Value) -> Value {
        let now = chrono::Utc::now().timestamp() as usize;
        let mut claims = json!({
            "sub": user_id,
            "exp": now + 3600,
            "iat": now,
            "iss": "flashcard-service",
            "aud": aud,
        });
        if let Some(plan) = subscription_type {
            claims["subscription_type"] = json!(plan);
        }
        claims
    }

    pub(crate) fn token_for(user_id: &str, subscription_type: Option<&str>) -> String {
        sign(&claims_with_audience(user_id, subscription_type, json!("flashcard-api")))
    }

    #[test]
    fn test_verify_valid_token() {
        let claims = settings().verify(&token_for("U1", Some("Pro"))).unwrap();
        assert_eq!(claims.sub, "U1");
        assert_eq!(claims.tier().unwrap(), SubscriptionTier::Pro);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let mut other = settings();
        other.secret = "another-secret".to_string();
        let err = other.verify(&token_for("U1", None)).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_wrong_audience_is_unauthorized() {
        let mut other = settings();
        other.audience = "someone-else".to_string();
        assert!(other.verify(&token_for("U1", None)).is_err());
    }

    #[test]
    fn test_audience_list_is_accepted() {
        let token = sign(&claims_with_audience(
            "U1",
            Some("Basic"),
            json!(["flashcard-api", "billing-portal"]),
        ));
        let claims = settings().verify(&token).unwrap();
        assert_eq!(claims.sub, "U1");
        assert_eq!(claims.tier().unwrap(), SubscriptionTier::Basic);
    }

    #[test]
    fn test_audience_list_without_ours_is_unauthorized() {
        let token = sign(&claims_with_audience("U1", Some("Basic"), json!(["billing-portal"])));
        assert!(matches!(settings().verify(&token), Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn test_missing_tier_is_invalid_plan() {
        let claims = settings().verify(&token_for("U1", None)).unwrap();
        assert!(matches!(claims.tier(), Err(AppError::InvalidPlan(_))));
    }
}

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::supabase::{error_from_response, SupabaseCtx};
use crate::error::ApiError;

const OBJECT_JSON: &str = "application/vnd.pgrst.object+json";

/// Whose credentials a table request carries. `Service` bypasses
/// row-level security; `User` relays the caller's own access token so
/// RLS stays the real gate for student-initiated reads.
pub enum Auth {
    Service,
    User(String),
}

/// One PostgREST table operation, in the `from(...).select().eq().order()`
/// idiom of the hosted service's client library.
pub struct TableRequest<'a> {
    ctx: &'a SupabaseCtx,
    table: &'a str,
    auth: Auth,
    select: Option<&'a str>,
    filters: Vec<(String, String)>,
    order: Option<String>,
}

impl<'a> TableRequest<'a> {
    pub fn service(ctx: &'a SupabaseCtx, table: &'a str) -> Self {
        Self::new(ctx, table, Auth::Service)
    }

    pub fn with_token(ctx: &'a SupabaseCtx, table: &'a str, access_token: &str) -> Self {
        Self::new(ctx, table, Auth::User(access_token.to_string()))
    }

    fn new(ctx: &'a SupabaseCtx, table: &'a str, auth: Auth) -> Self {
        Self {
            ctx,
            table,
            auth,
            select: None,
            filters: Vec::new(),
            order: None,
        }
    }

    pub fn select(mut self, columns: &'a str) -> Self {
        self.select = Some(columns);
        self
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{}", value.to_string())));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{column}.{direction}"));
        self
    }

    fn query_string(&self) -> String {
        let mut pairs: Vec<String> = Vec::new();
        pairs.push(format!("select={}", self.select.unwrap_or("*")));
        for (column, filter) in &self.filters {
            pairs.push(format!("{}={}", column, urlencoding::encode(filter)));
        }
        if let Some(order) = &self.order {
            pairs.push(format!("order={order}"));
        }
        pairs.join("&")
    }

    fn url(&self) -> String {
        format!("{}?{}", self.ctx.rest_endpoint(self.table), self.query_string())
    }

    fn headers(&self, single_object: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let (apikey, bearer) = match &self.auth {
            Auth::Service => (
                self.ctx.service_role_key.clone(),
                self.ctx.service_auth_header(),
            ),
            Auth::User(token) => (self.ctx.anon_key.clone(), format!("Bearer {token}")),
        };
        if let Ok(value) = HeaderValue::from_str(&apikey) {
            headers.insert("apikey", value);
        }
        if let Ok(value) = HeaderValue::from_str(&bearer) {
            headers.insert(AUTHORIZATION, value);
        }
        if single_object {
            headers.insert(ACCEPT, HeaderValue::from_static(OBJECT_JSON));
        }
        headers
    }

    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, ApiError> {
        let res = self
            .ctx
            .http
            .get(self.url())
            .headers(self.headers(false))
            .send()
            .await?;
        read_json(res).await
    }

    pub async fn fetch_optional<T: DeserializeOwned>(self) -> Result<Option<T>, ApiError> {
        let rows: Vec<T> = self.fetch().await?;
        Ok(rows.into_iter().next())
    }

    /// Single-object read; a missing row is a plain not-found, matching
    /// the client library's `.single()`.
    pub async fn fetch_one<T: DeserializeOwned>(self, missing: &str) -> Result<T, ApiError> {
        let res = self
            .ctx
            .http
            .get(self.url())
            .headers(self.headers(true))
            .send()
            .await?;
        if res.status() == reqwest::StatusCode::NOT_ACCEPTABLE {
            return Err(ApiError::NotFound(missing.to_string()));
        }
        read_json(res).await
    }

    pub async fn insert<T: DeserializeOwned>(self, body: &impl Serialize) -> Result<T, ApiError> {
        let mut headers = self.headers(true);
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        let res = self
            .ctx
            .http
            .post(self.url())
            .headers(headers)
            .json(body)
            .send()
            .await?;
        read_json(res).await
    }

    /// PATCH every row matched by the filters; returns the updated rows.
    pub async fn update<T: DeserializeOwned>(
        self,
        body: &impl Serialize,
    ) -> Result<Vec<T>, ApiError> {
        let mut headers = self.headers(false);
        headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        let res = self
            .ctx
            .http
            .patch(self.url())
            .headers(headers)
            .json(body)
            .send()
            .await?;
        read_json(res).await
    }

    pub async fn delete(self) -> Result<(), ApiError> {
        let res = self
            .ctx
            .http
            .delete(self.url())
            .headers(self.headers(false))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(error_from_response(res).await);
        }
        Ok(())
    }
}

async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ApiError> {
    if !res.status().is_success() {
        return Err(error_from_response(res).await);
    }
    res.json()
        .await
        .map_err(|err| ApiError::Unexpected(format!("malformed supabase response: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    fn ctx() -> SupabaseCtx {
        SupabaseCtx {
            url: "https://proj.supabase.co".into(),
            anon_key: "anon".into(),
            service_role_key: "service".into(),
            jwt_secret: "secret".into(),
            http: Client::new(),
        }
    }

    #[test]
    fn query_string_defaults_to_select_all() {
        let ctx = ctx();
        let req = TableRequest::service(&ctx, "profiles");
        assert_eq!(req.query_string(), "select=*");
    }

    #[test]
    fn filters_and_order_build_postgrest_query_params() {
        let ctx = ctx();
        let req = TableRequest::service(&ctx, "reports")
            .select("id,student_name")
            .eq("user_email", "a@x.com")
            .order("created_at", false);
        assert_eq!(
            req.query_string(),
            "select=id,student_name&user_email=eq.a%40x.com&order=created_at.desc"
        );
        assert_eq!(
            req.url(),
            "https://proj.supabase.co/rest/v1/reports?select=id,student_name&user_email=eq.a%40x.com&order=created_at.desc"
        );
    }

    #[test]
    fn ascending_order_uses_asc_suffix() {
        let ctx = ctx();
        let req = TableRequest::service(&ctx, "profiles")
            .eq("role", "student")
            .order("full_name", true);
        assert_eq!(
            req.query_string(),
            "select=*&role=eq.student&order=full_name.asc"
        );
    }

    #[test]
    fn service_and_user_auth_carry_different_credentials() {
        let ctx = ctx();
        let service = TableRequest::service(&ctx, "profiles").headers(false);
        assert_eq!(service.get("apikey").unwrap(), "service");
        assert_eq!(service.get(AUTHORIZATION).unwrap(), "Bearer service");

        let user = TableRequest::with_token(&ctx, "reports", "tok123").headers(true);
        assert_eq!(user.get("apikey").unwrap(), "anon");
        assert_eq!(user.get(AUTHORIZATION).unwrap(), "Bearer tok123");
        assert_eq!(user.get(ACCEPT).unwrap(), OBJECT_JSON);
    }
}

mod adapters;
mod config;
mod dtos;
mod errors;
mod services;

use std::sync::Arc;

use adapters::postgres::repositories::{
    CountryInclude, HotelInclude, IncludePath, UnitOfWorkFactory,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use config::{Config, JwtSettings};
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use dotenvy::dotenv;
use dtos::countries::{CountryCreateDTO, CountryDTO, CountryUpdateDTO};
use dtos::hotels::{HotelCreateDTO, HotelDTO, HotelUpdateDTO};
use dtos::paging::{ListQuery, Listing};
use dtos::users::{LoginUserDTO, UserOutDTO, UserRegisterDTO};
use errors::{ApiError, FieldError, RepoError};
use serde_json::{json, Value};
use services::auth::{AuthManager, AuthUser};
use services::countries::CountriesService;
use services::hotels::HotelsService;
use services::users::UsersService;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub struct AppState {
    pub countries: CountriesService,
    pub hotels: HotelsService,
    pub users: UsersService,
    pub uow_factory: UnitOfWorkFactory,
    pub jwt: JwtSettings,
    pub max_page_size: u32,
}

impl AppState {
    fn new(uow_factory: UnitOfWorkFactory, jwt: JwtSettings, max_page_size: u32) -> Self {
        Self {
            countries: CountriesService::new(uow_factory.clone()),
            hotels: HotelsService::new(uow_factory.clone()),
            users: UsersService::new(uow_factory.clone()),
            uow_factory,
            jwt,
            max_page_size,
        }
    }
}

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env().expect("invalid configuration");

    // Migrations run over a plain sync connection before the pool starts.
    let mut migration_conn =
        PgConnection::establish(&config.database_url).expect("database connection");
    migration_conn
        .run_pending_migrations(MIGRATIONS)
        .expect("running migrations");
    drop(migration_conn);

    let manager =
        AsyncDieselConnectionManager::<diesel_async::AsyncPgConnection>::new(&config.database_url);
    let pool = Pool::builder(manager).build().unwrap();
    let uow_factory = UnitOfWorkFactory::new(pool);

    let state = Arc::new(AppState::new(
        uow_factory,
        config.jwt.clone(),
        config.max_page_size,
    ));
    let app = create_app(state);

    tracing::info!(addr = %config.bind_addr, "starting server");
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

#[derive(OpenApi)]
#[openapi(
    paths(
        register,
        login,
        get_countries,
        get_country,
        create_country,
        update_country,
        delete_country,
        get_hotels,
        get_hotel,
        create_hotel,
        update_hotel,
        delete_hotel,
    ),
    components(schemas(
        CountryDTO,
        CountryCreateDTO,
        HotelDTO,
        HotelCreateDTO,
        UserRegisterDTO,
        UserOutDTO,
        LoginUserDTO,
        FieldError,
    )),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/account/register", axum::routing::post(register))
        .route("/api/account/login", axum::routing::post(login))
        .route("/api/country", get(get_countries).post(create_country))
        .route(
            "/api/country/:id",
            get(get_country).put(update_country).delete(delete_country),
        )
        .route("/api/hotel", get(get_hotels).post(create_hotel))
        .route(
            "/api/hotel/:id",
            get(get_hotel).put(update_hotel).delete(delete_hotel),
        )
        .with_state(state)
}

fn validated(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

fn require_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

#[utoipa::path(
    post,
    path = "/api/account/register",
    request_body = UserRegisterDTO,
    responses(
        (status = 201, description = "User created", body = UserOutDTO),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Email already registered"),
    )
)]
async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UserRegisterDTO>,
) -> Result<(StatusCode, Json<UserOutDTO>), ApiError> {
    validated(payload.validate())?;
    let created = state.users.register(&payload).await?;
    tracing::info!(user_id = created.id, "registered user");
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    post,
    path = "/api/account/login",
    request_body = LoginUserDTO,
    responses(
        (status = 200, description = "Signed token"),
        (status = 401, description = "Invalid credentials"),
    )
)]
async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginUserDTO>,
) -> Result<Json<Value>, ApiError> {
    validated(payload.validate())?;
    let mut auth = AuthManager::new(state.jwt.clone(), state.uow_factory.clone());
    if !auth.validate_user(&payload.email, &payload.password).await? {
        return Err(ApiError::Unauthorized);
    }
    let token = auth.create_token()?;
    Ok(Json(json!({ "token": token })))
}

#[utoipa::path(
    get,
    path = "/api/country",
    params(ListQuery),
    responses((status = 200, description = "Countries, paged"))
)]
async fn get_countries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<CountryDTO>>, ApiError> {
    let includes = CountryInclude::parse_list(query.include.as_deref())?;
    let page = query.page_or_default(state.max_page_size);
    let listing = state.countries.list(Some(page), includes).await?;
    Ok(Json(listing))
}

#[utoipa::path(
    get,
    path = "/api/country/{id}",
    params(
        ("id" = i32, Path, description = "Country id"),
        ("include" = Option<String>, Query, description = "Comma-separated relations, e.g. Hotels"),
    ),
    responses(
        (status = 200, description = "The country", body = CountryDTO),
        (status = 404, description = "No such country"),
    )
)]
async fn get_country(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<ListQuery>,
) -> Result<Json<CountryDTO>, ApiError> {
    let includes = CountryInclude::parse_list(query.include.as_deref())?;
    let country = state
        .countries
        .get(id, includes)
        .await?
        .ok_or(RepoError::NotFound {
            entity: "country",
            id,
        })?;
    Ok(Json(country))
}

#[utoipa::path(
    post,
    path = "/api/country",
    request_body = CountryCreateDTO,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Created", body = CountryDTO),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Administrator role required"),
    )
)]
async fn create_country(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CountryCreateDTO>,
) -> Result<(StatusCode, Json<CountryDTO>), ApiError> {
    require_admin(&user)?;
    validated(payload.validate())?;
    let created = state.countries.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/country/{id}",
    params(("id" = i32, Path, description = "Country id")),
    request_body = CountryCreateDTO,
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Updated"),
        (status = 404, description = "No such country"),
    )
)]
async fn update_country(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<CountryUpdateDTO>,
) -> Result<StatusCode, ApiError> {
    validated(payload.validate())?;
    state.countries.update(id, &payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/country/{id}",
    params(("id" = i32, Path, description = "Country id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "No such country"),
    )
)]
async fn delete_country(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;
    state.countries.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/hotel",
    params(ListQuery),
    responses((status = 200, description = "Hotels, paged when requested"))
)]
async fn get_hotels(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Listing<HotelDTO>>, ApiError> {
    let includes = HotelInclude::parse_list(query.include.as_deref())?;
    let page = query.page(state.max_page_size);
    let listing = state.hotels.list(page, includes).await?;
    Ok(Json(listing))
}

#[utoipa::path(
    get,
    path = "/api/hotel/{id}",
    params(
        ("id" = i32, Path, description = "Hotel id"),
        ("include" = Option<String>, Query, description = "Comma-separated relations, e.g. Country"),
    ),
    responses(
        (status = 200, description = "The hotel", body = HotelDTO),
        (status = 404, description = "No such hotel"),
    )
)]
async fn get_hotel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<ListQuery>,
) -> Result<Json<HotelDTO>, ApiError> {
    let includes = HotelInclude::parse_list(query.include.as_deref())?;
    let hotel = state
        .hotels
        .get(id, includes)
        .await?
        .ok_or(RepoError::NotFound { entity: "hotel", id })?;
    Ok(Json(hotel))
}

#[utoipa::path(
    post,
    path = "/api/hotel",
    request_body = HotelCreateDTO,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Created", body = HotelDTO),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Administrator role required"),
    )
)]
async fn create_hotel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<HotelCreateDTO>,
) -> Result<(StatusCode, Json<HotelDTO>), ApiError> {
    require_admin(&user)?;
    validated(payload.validate())?;
    let created = state.hotels.create(&payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/hotel/{id}",
    params(("id" = i32, Path, description = "Hotel id")),
    request_body = HotelCreateDTO,
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Updated"),
        (status = 404, description = "No such hotel"),
    )
)]
async fn update_hotel(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i32>,
    Json(payload): Json<HotelUpdateDTO>,
) -> Result<StatusCode, ApiError> {
    validated(payload.validate())?;
    state.hotels.update(id, &payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/api/hotel/{id}",
    params(("id" = i32, Path, description = "Hotel id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Administrator role required"),
        (status = 404, description = "No such hotel"),
    )
)]
async fn delete_hotel(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, ApiError> {
    require_admin(&user)?;
    state.hotels.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

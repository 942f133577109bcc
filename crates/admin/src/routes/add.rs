//! Create-vehicle form.

use std::borrow::Cow;
use std::collections::HashMap;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::instrument;
use validator::{Validate, ValidationError, ValidationErrors};

use vehicle_manager_core::{FuelType, Price, VehicleFormData, format::color_name};

use super::vehicles::details_url;
use super::{ErrorTemplate, LayoutView};
use crate::middleware::RequireSession;
use crate::query::AddOptions;
use crate::state::AppState;

const REQUIRED: &str = "This field is required";
const WHOLE_NUMBER: &str = "Only whole numbers are allowed";

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

fn validate_fuel(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("required", "Select a fuel type"));
    }
    value
        .parse::<FuelType>()
        .map(|_| ())
        .map_err(|_| invalid("fuel", "Unknown fuel type"))
}

fn validate_whole_number(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("required", REQUIRED));
    }
    if value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("whole_number", WHOLE_NUMBER))
    }
}

fn validate_date(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(invalid("required", REQUIRED));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| invalid("date", "Enter a valid date"))
}

/// Submitted create form, as entered.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct AddVehicleForm {
    #[serde(default)]
    #[validate(length(min = 1, message = "Registration number is required"))]
    pub vrm: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Select a manufacturer"))]
    pub manufacturer: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Select a model"))]
    pub model: String,
    #[serde(default, rename = "type")]
    #[validate(length(min = 1, message = "Select a type"))]
    pub vehicle_type: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Select a colour"))]
    pub color: String,
    #[serde(default)]
    #[validate(custom = "validate_fuel")]
    pub fuel: String,
    #[serde(default)]
    #[validate(custom = "validate_whole_number")]
    pub mileage: String,
    #[serde(default, rename = "registrationDate")]
    #[validate(custom = "validate_date")]
    pub registration_date: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "VIN is required"))]
    pub vin: String,
    #[serde(default)]
    #[validate(custom = "validate_whole_number")]
    pub price: String,
}

/// First error message per form field.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldErrors {
    pub vrm: Option<String>,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub vehicle_type: Option<String>,
    pub color: Option<String>,
    pub fuel: Option<String>,
    pub mileage: Option<String>,
    pub registration_date: Option<String>,
    pub vin: Option<String>,
    pub price: Option<String>,
}

impl FieldErrors {
    fn from_validation(errors: &ValidationErrors) -> Self {
        let fields = errors.field_errors();
        // Renamed fields may be keyed by either name.
        let first = |names: &[&str]| -> Option<String> {
            names.iter().find_map(|name| message(&fields, name))
        };

        Self {
            vrm: first(&["vrm"]),
            manufacturer: first(&["manufacturer"]),
            model: first(&["model"]),
            vehicle_type: first(&["type", "vehicle_type"]),
            color: first(&["color"]),
            fuel: first(&["fuel"]),
            mileage: first(&["mileage"]),
            registration_date: first(&["registrationDate", "registration_date"]),
            vin: first(&["vin"]),
            price: first(&["price"]),
        }
    }
}

fn message(fields: &HashMap<&'static str, &Vec<ValidationError>>, name: &str) -> Option<String> {
    let error = fields.get(name)?.first()?;
    Some(
        error
            .message
            .as_ref()
            .map_or_else(|| error.code.to_string(), ToString::to_string),
    )
}

impl AddVehicleForm {
    fn trimmed(self) -> Self {
        Self {
            vrm: self.vrm.trim().to_string(),
            manufacturer: self.manufacturer.trim().to_string(),
            model: self.model.trim().to_string(),
            vehicle_type: self.vehicle_type.trim().to_string(),
            color: self.color.trim().to_string(),
            fuel: self.fuel.trim().to_string(),
            mileage: self.mileage.trim().to_string(),
            registration_date: self.registration_date.trim().to_string(),
            vin: self.vin.trim().to_string(),
            price: self.price.trim().to_string(),
        }
    }

    /// Validate and coerce into the body of a create request.
    ///
    /// # Errors
    ///
    /// Returns the per-field messages when any field is invalid.
    pub fn to_form_data(&self) -> Result<VehicleFormData, FieldErrors> {
        self.validate()
            .map_err(|e| FieldErrors::from_validation(&e))?;

        let mut errors = FieldErrors::default();
        let mileage = self.mileage.parse::<u32>().map_err(|_| {
            errors.mileage = Some("Mileage is too large".to_string());
        });
        let price = self.price.parse::<u64>().map_err(|_| {
            errors.price = Some("Price is too large".to_string());
        });
        let registration_date = NaiveDate::parse_from_str(&self.registration_date, "%Y-%m-%d");
        let fuel = self.fuel.parse::<FuelType>();

        match (mileage, price, registration_date, fuel) {
            (Ok(mileage), Ok(price), Ok(registration_date), Ok(fuel)) => Ok(VehicleFormData {
                vrm: self.vrm.clone(),
                manufacturer: self.manufacturer.clone(),
                model: self.model.clone(),
                vehicle_type: self.vehicle_type.clone(),
                fuel,
                color: self.color.clone(),
                vin: self.vin.clone(),
                mileage,
                registration_date,
                price: Price::from_whole_units(price),
            }),
            _ => Err(errors),
        }
    }
}

/// `<option>` of a select.
#[derive(Debug, Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Options of a select, with the entered value preselected.
#[derive(Debug, Clone)]
pub struct SelectView {
    pub placeholder: &'static str,
    pub nothing_selected: bool,
    pub options: Vec<OptionView>,
}

impl SelectView {
    fn new(
        placeholder: &'static str,
        options: impl IntoIterator<Item = (String, String)>,
        selected: &str,
    ) -> Self {
        let options: Vec<OptionView> = options
            .into_iter()
            .map(|(value, label)| OptionView {
                selected: value == selected,
                value,
                label,
            })
            .collect();

        Self {
            placeholder,
            nothing_selected: !options.iter().any(|o| o.selected),
            options,
        }
    }

    fn plain(placeholder: &'static str, values: &[String], selected: &str) -> Self {
        Self::new(
            placeholder,
            values.iter().map(|v| (v.clone(), v.clone())),
            selected,
        )
    }
}

/// Every select of the form.
#[derive(Debug, Clone)]
pub struct SelectsView {
    pub manufacturer: SelectView,
    pub model: SelectView,
    pub vehicle_type: SelectView,
    pub color: SelectView,
    pub fuel: SelectView,
}

impl SelectsView {
    fn new(options: &AddOptions, form: &AddVehicleForm) -> Self {
        Self {
            manufacturer: SelectView::plain(
                "Select a manufacturer",
                &options.manufacturers,
                &form.manufacturer,
            ),
            model: SelectView::plain("Select a model", &options.models, &form.model),
            vehicle_type: SelectView::plain("Select a type", &options.types, &form.vehicle_type),
            // Colours are offered and submitted by display name.
            color: SelectView::new(
                "Select a colour",
                options.colors.iter().map(|c| {
                    let name = color_name(c);
                    (name.clone(), name)
                }),
                &form.color,
            ),
            fuel: SelectView::new(
                "Select a fuel type",
                FuelType::ALL
                    .into_iter()
                    .map(|fuel| (fuel.as_str().to_string(), fuel.label().to_string())),
                &form.fuel,
            ),
        }
    }
}

/// Create form page template.
#[derive(Template, WebTemplate)]
#[template(path = "add.html")]
pub struct AddTemplate {
    pub layout: LayoutView,
    pub form: AddVehicleForm,
    pub selects: SelectsView,
    pub errors: FieldErrors,
    /// Error returned by the create request.
    pub error: Option<String>,
}

/// Create form page handler.
///
/// GET /add
#[instrument(skip(auth, state))]
pub async fn add_page(auth: RequireSession, State(state): State<AppState>) -> Response {
    let layout = LayoutView::load(&state, &auth, "/add").await;
    let api = auth.api(state.api());

    match state.queries().add_options(&api).await {
        Ok(options) => {
            let form = AddVehicleForm::default();
            AddTemplate {
                layout,
                selects: SelectsView::new(&options, &form),
                form,
                errors: FieldErrors::default(),
                error: None,
            }
            .into_response()
        }
        Err(e) => {
            tracing::error!("Failed to load form options: {e}");
            ErrorTemplate::for_query(layout, &e, "/add")
        }
    }
}

/// Create a vehicle and go to its details page.
///
/// Invalid input is rejected without calling the API. Either way a failure
/// renders the form again with what was entered.
///
/// POST /add
#[instrument(skip(auth, state, form))]
pub async fn create(
    auth: RequireSession,
    State(state): State<AppState>,
    Form(form): Form<AddVehicleForm>,
) -> Response {
    let form = form.trimmed();
    let api = auth.api(state.api());

    let (status, errors, error) = match form.to_form_data() {
        Ok(data) => match api.create_vehicle(&data).await {
            Ok(id) => return Redirect::to(&details_url(&id)).into_response(),
            Err(e) => {
                tracing::warn!("Failed to create vehicle: {e}");
                (StatusCode::BAD_GATEWAY, FieldErrors::default(), Some(e.to_string()))
            }
        },
        Err(errors) => (StatusCode::UNPROCESSABLE_ENTITY, errors, None),
    };

    let layout = LayoutView::load(&state, &auth, "/add").await;
    match state.queries().add_options(&api).await {
        Ok(options) => {
            let page = AddTemplate {
                layout,
                selects: SelectsView::new(&options, &form),
                form,
                errors,
                error,
            };
            (status, page).into_response()
        }
        Err(e) => ErrorTemplate::for_query(layout, &e, "/add"),
    }
}

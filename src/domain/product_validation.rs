pub const MIN_STOCK: i32 = 0;
pub const MAX_STOCK: i32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    StockOutOfRange { stock: i32 },
    EmptyProductId,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::StockOutOfRange { stock } => {
                write!(f, "stock {} is outside {}..={}", stock, MIN_STOCK, MAX_STOCK)
            }
            ValidationError::EmptyProductId => write!(f, "product id cannot be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::StockOutOfRange { .. } => "stock",
            ValidationError::EmptyProductId => "id",
        }
    }
}

pub struct ProductValidator;

impl ProductValidator {
    /// Validate a stock write before it reaches the gateway
    pub fn validate_stock_update(id: &str, stock: i32) -> Result<(), ValidationError> {
        Self::validate_id(id)?;
        Self::validate_stock(stock)?;
        Ok(())
    }

    pub fn validate_id(id: &str) -> Result<(), ValidationError> {
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyProductId);
        }
        Ok(())
    }

    fn validate_stock(stock: i32) -> Result<(), ValidationError> {
        if !(MIN_STOCK..=MAX_STOCK).contains(&stock) {
            return Err(ValidationError::StockOutOfRange { stock });
        }
        Ok(())
    }
}

use anyhow::{Context, Result};
use store::Store;
use tracing::{debug, info, trace};

use crate::config::Settings;
use crate::handlers::auth::normalize_email;

/// Flips the author flag of an existing account.
pub async fn grant_author(email: &str, authorised: bool, database_url: Option<String>) -> Result<()> {
    trace!("Entering grant_author function");
    let database_url = match database_url {
        Some(url) => url,
        None => Settings::load()?.database_url,
    };
    debug!("Database URL: {}", database_url);

    let store = Store::connect(&database_url).await?;
    let email = normalize_email(email);
    let user = store::users::set_authorised(store.conn(), &email, authorised)
        .await
        .with_context(|| format!("could not update author access for {}", email))?;

    if authorised {
        info!(user_id = user.id, "{} may now use the author area", user.email);
    } else {
        info!(user_id = user.id, "{} can no longer use the author area", user.email);
    }
    Ok(())
}

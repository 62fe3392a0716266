//! src/startup.rs
use crate::configuration::{
    DatabaseSettings, EmailBackend, EmailSettings, Settings, StorageBackend, StorageSettings,
};
use crate::dispatcher::AlertDispatcher;
use crate::domain::AlertTemplate;
use crate::email::{Brevo, EmailSender, Noop, Smtp};
use crate::routes::{
    health_check, json_error_handler, list_subscribers, send_alert, subscribe, unsubscribe,
};
use crate::store::{FileStore, MemoryStore, PostgresStore, SubscriberStore};
use actix_cors::Cors;
use actix_web::dev::Server;
use actix_web::http::{header, Method};
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub async fn build(config: Settings) -> Result<Application, anyhow::Error> {
    let store = get_store(&config.storage, &config.database).await?;
    let sender = get_email_sender(&config.email)?;

    let dispatcher = AlertDispatcher::new(
        store.clone(),
        sender,
        AlertTemplate::new(config.alert.website_url.clone()),
        config.alert.max_concurrent_sends,
        config.alert.deadline(),
    );

    let address = format!("{}:{}", config.application.host, config.application.port);
    let tcp_listener =
        TcpListener::bind(&address).with_context(|| format!("Failed to bind {}", address))?;
    let port = tcp_listener.local_addr()?.port();

    let subscribers = store_size(store.as_ref()).await;
    let server = run(
        tcp_listener,
        store,
        dispatcher,
        config.application.allowed_origins,
    )?;

    match subscribers {
        Some(subscribers) => tracing::info!(
            "Alerter running on {}:{} with {} subscribers",
            config.application.host,
            port,
            subscribers
        ),
        None => tracing::info!("Alerter running on {}:{}", config.application.host, port),
    }

    Ok(Application { port, server })
}

/// Number of stored subscribers, or `None` when the store cannot be read yet.
pub async fn store_size(store: &dyn SubscriberStore) -> Option<usize> {
    match store.list().await {
        Ok(subscribers) => Some(subscribers.len()),
        Err(e) => {
            tracing::warn!(error.cause_chain = ?e, "Could not count subscribers at startup");
            None
        }
    }
}

pub async fn get_store(
    storage: &StorageSettings,
    database: &DatabaseSettings,
) -> Result<Arc<dyn SubscriberStore>, anyhow::Error> {
    let store: Arc<dyn SubscriberStore> = match storage.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .acquire_timeout(database.timeout())
                .connect_lazy_with(database.with_db());
            Arc::new(PostgresStore::new(pool, database.timeout()))
        }
        StorageBackend::File => Arc::new(
            FileStore::open(&storage.file_path)
                .await
                .context("Failed to open the subscriber file")?,
        ),
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };

    Ok(store)
}

pub fn get_email_sender(email: &EmailSettings) -> Result<Arc<dyn EmailSender>, anyhow::Error> {
    let sender: Arc<dyn EmailSender> = match email.backend {
        EmailBackend::Brevo => {
            let brevo = email
                .brevo
                .as_ref()
                .context("`email.brevo` settings are required for the brevo backend")?;
            Arc::new(Brevo::new(
                brevo.api_url.clone(),
                brevo.api_key.clone(),
                email.sender_name.clone(),
                email.sender_email.clone(),
                email.timeout(),
            )?)
        }
        EmailBackend::Smtp => {
            let smtp = email
                .smtp
                .as_ref()
                .context("`email.smtp` settings are required for the smtp backend")?;
            let address: lettre::Address = email
                .sender_email
                .parse()
                .with_context(|| format!("Invalid sender email {}", email.sender_email))?;
            let mailbox = lettre::message::Mailbox::new(Some(email.sender_name.clone()), address);

            if smtp.starttls {
                Arc::new(Smtp::relay(
                    &smtp.host,
                    smtp.port,
                    smtp.username.clone(),
                    smtp.password.clone(),
                    mailbox,
                    email.timeout(),
                )?)
            } else {
                Arc::new(Smtp::unencrypted(
                    &smtp.host,
                    smtp.port,
                    mailbox,
                    email.timeout(),
                ))
            }
        }
        EmailBackend::Noop => Arc::new(Noop),
    };

    Ok(sender)
}

fn cors(allowed_origins: &[String]) -> Cors {
    allowed_origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allowed_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allowed_header(header::CONTENT_TYPE)
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn SubscriberStore>,
    dispatcher: AlertDispatcher,
    allowed_origins: Vec<String>,
) -> Result<Server, std::io::Error> {
    let store = web::Data::from(store);
    let dispatcher = web::Data::new(dispatcher);
    let json_config = web::JsonConfig::default().error_handler(json_error_handler);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/subscribe", web::post().to(subscribe))
            .route("/unsubscribe", web::post().to(unsubscribe))
            .route("/subscribers", web::get().to(list_subscribers))
            .route("/send-alert", web::post().to(send_alert))
            .app_data(json_config.clone())
            .app_data(store.clone())
            .app_data(dispatcher.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

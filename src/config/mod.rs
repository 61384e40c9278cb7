use anyhow::Result;

#[derive(Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub drive: DriveConfig,
    pub session: SessionConfig,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub username: String,
    pub password: String,
    pub server: String,
    pub port: u32,
    pub database: String,
    pub pool_size: u32,
}

#[derive(Clone)]
pub struct DriveConfig {
    pub server: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    pub public_url: String,
}

#[derive(Clone)]
pub struct SessionConfig {
    pub jwt_secret: String,
}

fn env_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl AppConfig {
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.database.username,
            self.database.password,
            self.database.server,
            self.database.port,
            self.database.database
        )
    }

    pub fn from_env() -> Result<Self> {
        let database = DatabaseConfig {
            username: env_str("DATABASE_USERNAME", "swappy"),
            password: env_str("DATABASE_PASSWORD", ""),
            server: env_str("DATABASE_SERVER", "localhost"),
            port: env_str("DATABASE_PORT", "5432").parse().unwrap_or(5432),
            database: env_str("DATABASE_NAME", "swappy"),
            pool_size: env_str("DATABASE_POOL_SIZE", "10").parse().unwrap_or(10),
        };
        let drive = DriveConfig {
            server: {
                let server = env_str("DRIVE_SERVER", "http://localhost:9000");
                if !server.starts_with("http://") && !server.starts_with("https://") {
                    format!("http://{}", server)
                } else {
                    server
                }
            },
            access_key: env_str("DRIVE_ACCESSKEY", "minioadmin"),
            secret_key: env_str("DRIVE_SECRET", "minioadmin"),
            bucket: env_str("DRIVE_BUCKET", "swappy-uploads"),
            public_url: env_str("DRIVE_PUBLIC_URL", "http://localhost:9000/swappy-uploads")
                .trim_end_matches('/')
                .to_string(),
        };
        Ok(AppConfig {
            server: ServerConfig {
                host: env_str("SERVER_HOST", "127.0.0.1"),
                port: env_str("SERVER_PORT", "8080").parse().unwrap_or(8080),
            },
            database,
            drive,
            session: SessionConfig {
                jwt_secret: env_str("SESSION_SECRET", "swappy-dev-secret"),
            },
        })
    }
}

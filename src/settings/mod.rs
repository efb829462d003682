use config::{Config, ConfigError, File};
use serde::de::{self, Deserializer, Unexpected, Visitor};
use serde::Deserialize;
use std::fmt;

use crate::conf::types::*;
use crate::error::Error;
use crate::zones::types::*;

/// A manifest describing a whole server: ACLs, global options, and
/// views holding zones with their records.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub acls: Vec<AclSettings>,
    #[serde(default)]
    pub options: Vec<StatementSettings>,
    #[serde(default)]
    pub views: Vec<ViewSettings>,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct AclSettings {
    pub name: String,
    pub addresses: Vec<String>,
    pub comment: Option<String>,
}

/// A free-form statement: `label values... { items; };`
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct StatementSettings {
    pub label: String,
    #[serde(default)]
    pub values: Vec<String>,
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct ViewSettings {
    pub name: String,
    pub class: Option<String>,
    pub comment: Option<String>,
    pub match_clients: Option<Vec<String>>,
    pub match_destinations: Option<Vec<String>>,
    pub notify_source: Option<ServerSettings>,
    pub transfer_source: Option<ServerSettings>,
    #[serde(default)]
    pub statements: Vec<StatementSettings>,
    #[serde(default)]
    pub zones: Vec<ZoneSettings>,
}

/// An address with an optional port, and for masters an optional key.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct ServerSettings {
    pub address: String,
    pub port: Option<u16>,
    pub key: Option<String>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KindSettings {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZoneTypeSettings {
    #[default]
    Master,
    Slave,
    Forward,
    Hint,
    Stub,
}

impl From<ZoneTypeSettings> for ZoneType {
    fn from(t: ZoneTypeSettings) -> Self {
        match t {
            ZoneTypeSettings::Master => ZoneType::Master,
            ZoneTypeSettings::Slave => ZoneType::Slave,
            ZoneTypeSettings::Forward => ZoneType::Forward,
            ZoneTypeSettings::Hint => ZoneType::Hint,
            ZoneTypeSettings::Stub => ZoneType::Stub,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NotifySettings {
    Yes,
    No,
    Explicit,
    MasterOnly,
}

impl From<NotifySettings> for Notify {
    fn from(n: NotifySettings) -> Self {
        match n {
            NotifySettings::Yes => Notify::Yes,
            NotifySettings::No => Notify::No,
            NotifySettings::Explicit => Notify::Explicit,
            NotifySettings::MasterOnly => Notify::MasterOnly,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct ZoneSettings {
    pub name: String,
    #[serde(default)]
    pub kind: KindSettings,
    #[serde(rename = "type", default)]
    pub zone_type: ZoneTypeSettings,
    /// Path of the zone file, as written in the configuration.
    pub file: String,
    pub comment: Option<String>,
    pub ttl: Option<Seconds>,
    #[serde(default)]
    pub epoch_serial: bool,
    pub soa: Option<SoaSettings>,
    #[serde(default)]
    pub records: Vec<RecordSettings>,
    pub allow_update: Option<Vec<String>>,
    pub allow_transfer: Option<Vec<String>>,
    #[serde(default)]
    pub masters: Vec<ServerSettings>,
    #[serde(default)]
    pub also_notify: Vec<ServerSettings>,
    pub notify: Option<NotifySettings>,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct SoaSettings {
    #[serde(default = "apex")]
    pub name: String,
    pub primary_ns: String,
    pub contact: String,
    pub serial: Option<u32>,
    pub refresh: Option<Seconds>,
    pub retry: Option<Seconds>,
    pub expire: Option<Seconds>,
    pub minimum: Option<Seconds>,
    pub ttl: Option<Seconds>,
}

/// One record, tagged by its `type`.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum RecordSettings {
    NS {
        #[serde(default = "apex")]
        name: String,
        host: String,
        ttl: Option<Seconds>,
        comment: Option<String>,
    },
    A {
        #[serde(default = "apex")]
        name: String,
        address: String,
        ttl: Option<Seconds>,
        comment: Option<String>,
    },
    AAAA {
        #[serde(default = "apex")]
        name: String,
        address: String,
        ttl: Option<Seconds>,
        comment: Option<String>,
    },
    MX {
        #[serde(default = "apex")]
        name: String,
        exchange: String,
        #[serde(default = "default_preference")]
        preference: u16,
        ttl: Option<Seconds>,
        comment: Option<String>,
    },
    TXT {
        #[serde(default = "apex")]
        name: String,
        text: String,
        ttl: Option<Seconds>,
        comment: Option<String>,
    },
    CNAME {
        #[serde(default = "apex")]
        name: String,
        target: String,
        ttl: Option<Seconds>,
        comment: Option<String>,
    },
    PTR {
        address: String,
        target: String,
        ttl: Option<Seconds>,
        comment: Option<String>,
    },
}

fn apex() -> String {
    APEX.to_string()
}

fn default_preference() -> u16 {
    DEFAULT_MX_PREFERENCE
}

/// A duration in seconds, given either as a number or in BIND's time
/// syntax (`1w2d`, `3h`, `30m`, `90s`).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Seconds(pub u32);

impl Seconds {
    /// Parse BIND's time syntax: digits, each run optionally followed
    /// by one of `s`, `m`, `h`, `d`, `w` (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        let mut total: u32 = 0;
        let mut current: Option<u32> = None;

        for c in s.trim().chars() {
            if let Some(digit) = c.to_digit(10) {
                current = Some(current.unwrap_or(0).checked_mul(10)?.checked_add(digit)?);
            } else {
                let multiplier = match c.to_ascii_lowercase() {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    'w' => 604_800,
                    _ => return None,
                };
                total = total.checked_add(current?.checked_mul(multiplier)?)?;
                current = None;
            }
        }

        match current {
            Some(n) => total.checked_add(n).map(Seconds),
            None if !s.trim().is_empty() => Some(Seconds(total)),
            None => None,
        }
    }
}

impl<'de> Deserialize<'de> for Seconds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SecondsVisitor;

        impl<'de> Visitor<'de> for SecondsVisitor {
            type Value = Seconds;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a number of seconds or a BIND time value")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Seconds, E>
            where
                E: de::Error,
            {
                u32::try_from(v)
                    .map(Seconds)
                    .map_err(|_| de::Error::invalid_value(Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Seconds, E>
            where
                E: de::Error,
            {
                u32::try_from(v)
                    .map(Seconds)
                    .map_err(|_| de::Error::invalid_value(Unexpected::Signed(v), &self))
            }

            fn visit_str<E>(self, v: &str) -> Result<Seconds, E>
            where
                E: de::Error,
            {
                Seconds::parse(v).ok_or_else(|| de::Error::invalid_value(Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(SecondsVisitor)
    }
}

/// A zone built from the manifest, with the path it should be written
/// to (relative to wherever the configuration is written).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneOutput {
    pub file: String,
    pub zone: Zone,
}

/// Everything the manifest describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub conf: BindConf,
    /// Zones which have a SOA or records, and so need a zone file.
    pub zones: Vec<ZoneOutput>,
}

impl Settings {
    /// Load a manifest.  The format is picked from the file extension.
    ///
    /// # Errors
    ///
    /// If the file cannot be read or does not match the schema.
    pub fn new(filename: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(filename))
            .build()?
            .try_deserialize()
    }

    /// Build the configuration and zones.
    ///
    /// # Errors
    ///
    /// If any record, address, or name is invalid, if names are
    /// duplicated, or if two zones with records share a zone file.
    pub fn build(&self) -> Result<Manifest, Error> {
        let mut conf = BindConf::new();
        let mut zones = Vec::new();

        for acl in &self.acls {
            let mut built = Acl::new(&acl.name, acl.addresses.iter());
            if let Some(comment) = &acl.comment {
                built = built.with_comment(comment);
            }
            conf.add_acl(built);
        }

        if !self.options.is_empty() {
            let mut options = Clause::options();
            for statement in &self.options {
                options.add_element(statement.to_statement());
            }
            conf.set_options(options);
        }

        for view_settings in &self.views {
            let mut view = match &view_settings.class {
                Some(class) => View::with_class(&view_settings.name, class),
                None => View::new(&view_settings.name),
            }?;
            if let Some(comment) = &view_settings.comment {
                view.set_comment(comment);
            }
            if let Some(addresses) = &view_settings.match_clients {
                view.set_match_clients(addresses.iter());
            }
            if let Some(addresses) = &view_settings.match_destinations {
                view.set_match_destinations(addresses.iter());
            }
            if let Some(source) = &view_settings.notify_source {
                view.set_notify_source(&source.address, source.port)?;
            }
            if let Some(source) = &view_settings.transfer_source {
                view.set_transfer_source(&source.address, source.port)?;
            }
            for statement in &view_settings.statements {
                view.set_statement(statement.to_statement());
            }

            for zone_settings in &view_settings.zones {
                let zone = zone_settings.build_zone()?;
                view.add_zone(zone_settings.build_conf(&zone)?)?;
                if zone.soa().is_some() || !zone.records().is_empty() {
                    if zones.iter().any(|z: &ZoneOutput| z.file == zone_settings.file) {
                        return Err(Error::validation(
                            "file",
                            &format!(
                                "'{}' is written by more than one zone",
                                zone_settings.file
                            ),
                        ));
                    }
                    zones.push(ZoneOutput {
                        file: zone_settings.file.clone(),
                        zone,
                    });
                }
            }

            conf.add_view(view)?;
        }

        Ok(Manifest { conf, zones })
    }
}

impl StatementSettings {
    fn to_statement(&self) -> Statement {
        let mut statement = Statement::new(&self.label);
        for value in &self.values {
            statement = statement.value(value);
        }
        if let Some(items) = &self.items {
            statement = statement.stanza(items.iter());
        }
        statement
    }
}

impl ZoneSettings {
    fn build_zone(&self) -> Result<Zone, Error> {
        let mut zone = match self.kind {
            KindSettings::Forward => Zone::forward(&self.name)?,
            KindSettings::Reverse => Zone::reverse(&self.name)?,
        };

        if let Some(Seconds(ttl)) = self.ttl {
            zone.set_default_ttl(ttl)?;
        }
        if self.epoch_serial {
            zone.set_serial_policy(SerialPolicy::Epoch);
        }

        if let Some(soa) = &self.soa {
            let defaults = Soa::default();
            zone.add_soa_at(
                &soa.name,
                &soa.primary_ns,
                &soa.contact,
                Soa {
                    serial: soa.serial,
                    refresh: soa.refresh.map_or(defaults.refresh, |s| s.0),
                    retry: soa.retry.map_or(defaults.retry, |s| s.0),
                    expire: soa.expire.map_or(defaults.expire, |s| s.0),
                    minimum: soa.minimum.map_or(defaults.minimum, |s| s.0),
                    ttl: soa.ttl.map(|s| s.0),
                },
            )?;
        }

        for record in &self.records {
            record.add_to(&mut zone)?;
        }

        Ok(zone)
    }

    fn build_conf(&self, zone: &Zone) -> Result<ZoneConf, Error> {
        let mut conf = ZoneConf::for_zone(zone, self.zone_type.into(), &self.file);
        if let Some(comment) = &self.comment {
            conf.set_comment(comment);
        }
        if let Some(addresses) = &self.allow_update {
            conf.set_allow_update(addresses.iter());
        }
        if let Some(addresses) = &self.allow_transfer {
            conf.set_allow_transfer(addresses.iter());
        }
        for master in &self.masters {
            conf.add_master(&master.address, master.port, master.key.as_deref())?;
        }
        for server in &self.also_notify {
            conf.add_also_notify(&server.address, server.port)?;
        }
        if let Some(notify) = self.notify {
            conf.set_notify(notify.into());
        }
        Ok(conf)
    }
}

impl RecordSettings {
    fn add_to(&self, zone: &mut Zone) -> Result<(), Error> {
        let (record, ttl, comment) = match self {
            RecordSettings::NS {
                name,
                host,
                ttl,
                comment,
            } => (ResourceRecord::ns(name, host)?, ttl, comment),
            RecordSettings::A {
                name,
                address,
                ttl,
                comment,
            } => (ResourceRecord::a(name, address)?, ttl, comment),
            RecordSettings::AAAA {
                name,
                address,
                ttl,
                comment,
            } => (ResourceRecord::aaaa(name, address)?, ttl, comment),
            RecordSettings::MX {
                name,
                exchange,
                preference,
                ttl,
                comment,
            } => (ResourceRecord::mx(name, *preference, exchange)?, ttl, comment),
            RecordSettings::TXT {
                name,
                text,
                ttl,
                comment,
            } => (ResourceRecord::txt(name, text)?, ttl, comment),
            RecordSettings::CNAME {
                name,
                target,
                ttl,
                comment,
            } => (ResourceRecord::cname(name, target)?, ttl, comment),
            RecordSettings::PTR {
                address,
                target,
                ttl,
                comment,
            } => (zone.ptr_record(address, target)?, ttl, comment),
        };

        let mut record = record.with_ttl(ttl.map(|s| s.0))?;
        if let Some(comment) = comment {
            record = record.with_comment(comment);
        }
        zone.add_record(record);
        Ok(())
    }
}

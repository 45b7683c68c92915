//! Construction of clients and source adapters from command-line settings
//!
//! Everything here runs before any request is sent, so a missing setting is
//! reported up front.

use eyre::{bail, OptionExt, Result as EyreResult};
use reqwest::Client;
use searchsync_index::{ElasticClient, EngineRegistrar};
use searchsync_source::sources::{
    KennisartikelSource, ObjectTypesClient, ObjectenClient, SmoelenboekSource, VacObjectTypes,
    VacSource,
};
use searchsync_source::{Credential, SourceAdapter, SourceKind};

use crate::cli::{ElasticArgs, EngineArgs, ObjectenArgs, SdgArgs};

pub fn adapter(
    kind: SourceKind,
    sdg: &SdgArgs,
    objecten: &ObjectenArgs,
) -> EyreResult<Box<dyn SourceAdapter>> {
    let adapter: Box<dyn SourceAdapter> = match kind {
        SourceKind::Kennisartikel => {
            let base_url = sdg.sdg_url.as_ref().ok_or_eyre("SDG_BASE_URL is not set")?;
            let api_key = sdg.sdg_api_key.clone().ok_or_eyre("SDG_API_KEY is not set")?;

            Box::new(KennisartikelSource::new(base_url, api_key)?)
        }
        SourceKind::Smoelenboek => Box::new(SmoelenboekSource::new(
            objecten_client(objecten)?,
            object_types_client(objecten)?,
        )),
        SourceKind::Vac => {
            let object_types = match &objecten.vac_object_type {
                Some(url) => VacObjectTypes::Fixed(url.clone()),
                None => VacObjectTypes::Lookup(object_types_client(objecten)?),
            };

            Box::new(VacSource::new(objecten_client(objecten)?, object_types))
        }
    };

    Ok(adapter)
}

fn objecten_client(args: &ObjectenArgs) -> EyreResult<ObjectenClient> {
    let base_url = args
        .objecten_url
        .clone()
        .ok_or_eyre("OBJECTEN_BASE_URL is not set")?;

    let credential = match (&args.objecten_token, &args.objecten_client_id, &args.objecten_client_secret) {
        (Some(token), _, _) => Credential::Token(token.clone()),
        (None, Some(client_id), Some(secret)) => Credential::signed(client_id, secret)?,
        _ => bail!("either OBJECTEN_TOKEN or OBJECTEN_CLIENT_ID and OBJECTEN_CLIENT_SECRET must be set"),
    };

    Ok(ObjectenClient::new(base_url, credential))
}

fn object_types_client(args: &ObjectenArgs) -> EyreResult<ObjectTypesClient> {
    let base_url = args
        .objecttypes_url
        .clone()
        .ok_or_eyre("OBJECTTYPES_BASE_URL is not set")?;
    let token = args
        .objecttypes_token
        .clone()
        .ok_or_eyre("OBJECTTYPES_TOKEN is not set")?;

    Ok(ObjectTypesClient::new(base_url, Credential::Token(token)))
}

pub fn elastic_client(args: &ElasticArgs, insecure: bool) -> EyreResult<ElasticClient> {
    let (base_url, username, password) = (
        args.elastic_url.clone(),
        args.elastic_username.clone(),
        args.elastic_password.clone(),
    );

    let client = if insecure {
        ElasticClient::insecure(base_url, username, password)?
    } else {
        ElasticClient::new(base_url, username, password)
    };

    Ok(client)
}

/// `None` unless every enterprise search setting is present.
pub fn engine_registrar(args: &EngineArgs, insecure: bool) -> EyreResult<Option<EngineRegistrar>> {
    let (Some(base_url), Some(api_key), Some(meta_engine)) =
        (&args.engine_url, &args.engine_api_key, &args.meta_engine)
    else {
        return Ok(None);
    };

    let http = Client::builder()
        .danger_accept_invalid_certs(insecure)
        .build()?;

    Ok(Some(EngineRegistrar::new(
        http,
        base_url.clone(),
        api_key.clone(),
        meta_engine.clone(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn objecten_args() -> ObjectenArgs {
        ObjectenArgs {
            objecten_url: Some("https://objecten.example.com".parse().unwrap()),
            objecten_token: None,
            objecten_client_id: None,
            objecten_client_secret: None,
            objecttypes_url: Some("https://objecttypen.example.com".parse().unwrap()),
            objecttypes_token: Some("types".to_owned()),
            vac_object_type: None,
        }
    }

    #[test]
    fn kennisartikel_requires_sdg_settings() {
        let sdg = SdgArgs {
            sdg_url: Some("https://sdg.example.com".parse().unwrap()),
            sdg_api_key: None,
        };

        let error = adapter(SourceKind::Kennisartikel, &sdg, &objecten_args())
            .err()
            .unwrap();

        assert!(error.to_string().contains("SDG_API_KEY"));
    }

    #[test]
    fn objecten_requires_a_credential() {
        let sdg = SdgArgs {
            sdg_url: None,
            sdg_api_key: None,
        };

        let error = adapter(SourceKind::Smoelenboek, &sdg, &objecten_args())
            .err()
            .unwrap();
        assert!(error.to_string().contains("OBJECTEN_TOKEN"));

        let mut signed = objecten_args();
        signed.objecten_client_id = Some("searchsync".to_owned());
        signed.objecten_client_secret = Some("secret".to_owned());

        let adapter = adapter(SourceKind::Vac, &sdg, &signed).unwrap();
        assert_eq!(adapter.source(), "VAC");
    }

    #[test]
    fn engine_is_optional() {
        let partial = EngineArgs {
            engine_url: Some("https://search.example.com".parse().unwrap()),
            engine_api_key: None,
            meta_engine: Some("kiss-engine".to_owned()),
            crawl_engine: None,
        };

        assert!(engine_registrar(&partial, false).unwrap().is_none());
    }
}

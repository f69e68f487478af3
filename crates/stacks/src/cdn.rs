//! CDN component - distribution fronting the website bucket

use crate::storage::BucketHandle;
use params::{PropertyKey, StackProps};
use shared::{Output, Prop, Resource, ResourceRef, Result, Stack, Token};
use tracing::info;

pub const STACK_NAME: &str = "CdnStack";

/// Output carrying the distribution URL
pub const URL_OUTPUT: &str = "CloudFrontCDNUrl";

const ORIGIN_ID: &str = "origin1";

/// Declared distribution
#[derive(Debug, Clone, PartialEq)]
pub struct DistributionHandle {
    pub resource: ResourceRef,
}

impl DistributionHandle {
    pub fn domain_name(&self) -> Token {
        self.resource.get_att("DomainName")
    }
}

/// Handles produced by the CDN component
#[derive(Debug, Clone, PartialEq)]
pub struct CdnOutputs {
    pub distribution: DistributionHandle,
}

/// Declare one default-behavior distribution over the website bucket.
///
/// The origin is reached through the bucket's public-read policy; no origin
/// access identity is attached.
pub fn declare(stack: &mut Stack, props: &StackProps, website: &BucketHandle) -> Result<CdnOutputs> {
    let comment = props.property(PropertyKey::CdnComment)?;
    let index_document = props.property(PropertyKey::CdnWebsiteIndexDocument)?;

    let get_head = || Prop::list(["GET", "HEAD"]);
    let config = Prop::map([
        ("Comment", Prop::from(comment)),
        ("DefaultRootObject", Prop::from(index_document)),
        ("Enabled", Prop::from(true)),
        ("HttpVersion", Prop::from("http2")),
        ("IPV6Enabled", Prop::from(true)),
        ("PriceClass", Prop::from("PriceClass_100")),
        (
            "ViewerCertificate",
            Prop::map([("CloudFrontDefaultCertificate", Prop::from(true))]),
        ),
        (
            "Origins",
            Prop::list([Prop::map([
                ("Id", Prop::from(ORIGIN_ID)),
                ("DomainName", Prop::from(website.regional_domain_name())),
                ("S3OriginConfig", Prop::empty_map()),
            ])]),
        ),
        (
            "DefaultCacheBehavior",
            Prop::map([
                ("TargetOriginId", Prop::from(ORIGIN_ID)),
                ("ViewerProtocolPolicy", Prop::from("redirect-to-https")),
                ("AllowedMethods", get_head()),
                ("CachedMethods", get_head()),
                ("Compress", Prop::from(true)),
                (
                    "ForwardedValues",
                    Prop::map([
                        ("QueryString", Prop::from(false)),
                        ("Cookies", Prop::map([("Forward", Prop::from("none"))])),
                    ]),
                ),
            ]),
        ),
    ]);

    let distribution = stack.add_resource(
        "AssetsCDN",
        Resource::new("AWS::CloudFront::Distribution").with("DistributionConfig", config),
    )?;
    let distribution = DistributionHandle {
        resource: distribution,
    };

    stack.add_output(
        URL_OUTPUT,
        Output::new(Token::concat([Token::literal("http://"), distribution.domain_name()]))
            .with_description("Website distribution URL"),
    )?;

    info!(stack = stack.name(), origin = %website.bucket_name, "declared distribution");
    Ok(CdnOutputs { distribution })
}

use hostlink_core::frame::{verify_fcs, with_fcs};
use hostlink_core::{Address, Area, Request, decode_response};
use proptest::prelude::*;

fn area() -> impl Strategy<Value = Area> {
    prop_oneof![Just(Area::Hr), Just(Area::Dm), Just(Area::Lr), Just(Area::Ir)]
}

proptest! {
    #[test]
    fn address_display_parses_back(
        area in area(),
        word in 0u16..=9999,
        bit in proptest::option::of(0u8..=15),
    ) {
        let address = Address { area, word, bit };
        let parsed: Address = address.to_string().parse().unwrap();
        prop_assert_eq!(parsed, address);
    }

    #[test]
    fn address_parse_does_not_panic(token in "\\PC{0,16}") {
        let _ = Address::parse(&token);
    }

    #[test]
    fn framed_commands_always_verify(body in "[ -~]{1,40}") {
        prop_assert!(verify_fcs(&with_fcs(&body)));
    }

    #[test]
    fn random_response_decode_does_not_panic(
        response in "\\PC{0,32}",
        bit in proptest::option::of(any::<u8>()),
    ) {
        let _ = decode_response(&response, "@00RR00840001", bit);
    }

    #[test]
    fn random_request_decode_does_not_panic(frame in "\\PC{0,32}") {
        let _ = Request::decode(&frame);
    }
}
